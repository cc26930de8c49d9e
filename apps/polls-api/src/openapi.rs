//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Polls API",
        version = "0.1.0",
        description = "Create polls, cast one vote per voter and read live results",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/polls", api = domain_polls::ApiDoc)
    ),
    tags(
        (name = "Polls", description = "Poll creation, voting and results")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_paths_are_nested() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        assert!(paths.contains(&"/api/polls".to_string()));
        assert!(paths.contains(&"/api/polls/{id}/vote".to_string()));
        assert!(paths.contains(&"/api/polls/stats".to_string()));
    }
}
