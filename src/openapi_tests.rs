#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::openapi::PathItemType;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        assert!(openapi.components.is_some());
        let components = openapi.components.as_ref().unwrap();

        assert!(components.schemas.contains_key("ErrorResponse"));
        assert!(components.schemas.contains_key("HealthResponse"));
        assert!(components.schemas.contains_key("Dashboard"));
        assert!(components.schemas.contains_key("BudgetProgress"));

        let json_result = serde_json::to_string(&openapi);
        assert!(json_result.is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        let error_response_schema = components.schemas.get("ErrorResponse").unwrap();

        if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) = error_response_schema {
            let properties = &obj.properties;
            assert!(properties.contains_key("error"));
            assert!(properties.contains_key("code"));
            assert!(properties.contains_key("success"));
        } else {
            panic!("ErrorResponse should be an object schema");
        }
    }

    #[test]
    fn test_health_response_schema_structure() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        let health_response_schema = components.schemas.get("HealthResponse").unwrap();

        if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) = health_response_schema {
            let properties = &obj.properties;
            assert!(properties.contains_key("status"));
            assert!(properties.contains_key("version"));
            assert!(properties.contains_key("database"));
        } else {
            panic!("HealthResponse should be an object schema");
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_resource_paths_documented() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        for path in [
            "/health",
            "/api/v1/auth/register",
            "/api/v1/auth/login",
            "/api/v1/auth/profile",
            "/api/v1/categories/{category_id}",
            "/api/v1/expenses",
            "/api/v1/expenses/export",
            "/api/v1/incomes/monthly-total",
            "/api/v1/budgets/copy",
            "/api/v1/savings/{saving_id}/deposit",
            "/api/v1/savings/{saving_id}/withdraw",
            "/api/v1/reports/dashboard",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }

        let profile = paths.get("/api/v1/auth/profile").unwrap();
        assert!(profile.operations.contains_key(&PathItemType::Get));
        assert!(profile.operations.contains_key(&PathItemType::Put));
    }

    #[test]
    fn test_only_public_operations_skip_security() {
        let openapi = ApiDoc::openapi();
        let public = ["/health", "/api/v1/auth/register", "/api/v1/auth/login"];

        for (path, item) in &openapi.paths.paths {
            for operation in item.operations.values() {
                let secured = operation.security.as_ref().is_some_and(|s| !s.is_empty());
                assert_eq!(
                    secured,
                    !public.contains(&path.as_str()),
                    "unexpected security setting on {}",
                    path
                );
            }
        }
    }
}
