use url::Url;

/// Builds the web URL of a pipeline from the repository clone URL.
///
/// Credentials and a trailing `.git` are dropped, e.g.
/// `https://gitlab.example.com/qa/games.git` and pipeline 77 give
/// <https://gitlab.example.com/qa/games/-/pipelines/77>.
///
/// Returns `None` when the clone URL cannot be parsed.
pub fn pipeline_web_url(repo_url: &str, pipeline_id: u64) -> Option<String> {
    let url = Url::parse(repo_url).ok()?;
    let path = url.path().trim_end_matches('/').trim_end_matches(".git");
    Some(format!(
        "{}{path}/-/pipelines/{pipeline_id}",
        url.origin().ascii_serialization()
    ))
}
