use domain_users::oauth::TOKEN_PATH;
use utoipa::OpenApi;
use utoipa::openapi::InfoBuilder;

/// Users domain document with the API routes moved under `/api`.
///
/// The token endpoint is mounted at the root and keeps its path.
pub struct ApiDoc;

impl OpenApi for ApiDoc {
    fn openapi() -> utoipa::openapi::OpenApi {
        let mut doc = domain_users::ApiDoc::openapi();

        doc.info = InfoBuilder::new()
            .title("Users API")
            .version(env!("CARGO_PKG_VERSION"))
            .description(Some(
                "User directory with password-grant login, token refresh and logout",
            ))
            .build();

        let paths = std::mem::take(&mut doc.paths.paths);
        doc.paths.paths = paths
            .into_iter()
            .map(|(path, item)| {
                if path.starts_with(TOKEN_PATH) {
                    (path, item)
                } else {
                    (format!("/api{path}"), item)
                }
            })
            .collect();

        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_paths_are_prefixed() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/user/login"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/user/{username}"));
        assert!(paths.iter().any(|p| p.as_str() == TOKEN_PATH));
        assert!(!paths.iter().any(|p| p.as_str() == "/user"));
        assert_eq!(doc.info.title, "Users API");
    }
}
