use std::env;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

impl ServiceContext {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_values(
            component,
            env_string("SERVICE_NAME"),
            env_string("STAGE"),
        )
    }

    fn from_values(
        component: &str,
        service_name: Option<String>,
        environment: Option<String>,
    ) -> Self {
        let component = component.trim().to_string();

        let service_name = service_name
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = environment
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "local".to_string());

        Self {
            service_name,
            environment,
            component,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_defaults_to_component() {
        let ctx = ServiceContext::from_values(" backend ", None, Some(String::new()));

        assert_eq!(ctx.service_name, "backend");
        assert_eq!(ctx.component, "backend");
        assert_eq!(ctx.environment, "local");
    }

    #[test]
    fn explicit_values_win() {
        let ctx = ServiceContext::from_values(
            "backend",
            Some("imaginex-api".to_string()),
            Some("production".to_string()),
        );

        assert_eq!(ctx.service_name, "imaginex-api");
        assert_eq!(ctx.environment, "production");
    }
}
