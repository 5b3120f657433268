// Blocks direct navigation to the handshake pages of the web app.
//
// Those pages only make sense as a popup opened by the relay: they need a
// token in the query string and a window opener to report back to.

pub const PROTECTED_PATHS: [&str; 2] = ["/auth", "/payment"];

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PATHS.iter().any(|protected| {
        path == *protected
            || path
                .strip_prefix(protected)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

pub fn should_redirect(path: &str, has_token: bool, has_opener: bool) -> bool {
    is_protected(path) && !(has_token && has_opener)
}

/// Page-world script running the same check as [`should_redirect`];
/// `window.opener` is not visible from the content script's world.
pub fn guard_script(home: &str) -> String {
    let paths = PROTECTED_PATHS
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(",");
    let home = serde_json::Value::from(home).to_string();

    format!(
        r#"(function () {{
  var path = window.location.pathname;
  var isProtected = [{paths}].some(function (p) {{
    return path === p || path.indexOf(p + "/") === 0;
  }});
  if (!isProtected) return;
  var token = new URLSearchParams(window.location.search).get("token");
  if (!token || !window.opener) {{
    window.location.replace({home});
  }}
}})();"#
    )
}
