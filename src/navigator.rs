use url::Url;

/// Consumer-provided browser navigation.
///
/// A web front end maps these onto `location.assign`,
/// `history.replaceState` and its router's push.
pub trait Navigator: Send + Sync + 'static {
    /// Full page load of `url`. Unloads the current page.
    fn redirect(&self, url: &Url);

    /// Replace the visible address with `url` without reloading.
    fn replace_url(&self, url: &Url);

    /// In-app route transition to `path`.
    fn navigate(&self, path: &str);
}

/// Returns `location` with the OAuth callback parameters removed.
///
/// Other query parameters and the fragment are kept. An emptied query
/// string is dropped entirely.
#[must_use]
pub fn strip_callback_params(location: &Url) -> Url {
    const CALLBACK_PARAMS: [&str; 4] = ["code", "state", "error", "error_description"];

    let kept: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(k, _)| !CALLBACK_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = location.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
