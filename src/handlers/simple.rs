use crate::models::FileLink;

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, links: impl Iterator<Item = (String, String)>) -> String {
    let title = escape(title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta name=\"pypi:repository-version\" content=\"1.0\">\n    <title>{title}</title>\n  </head>\n  <body>\n    <h1>{title}</h1>\n",
        title = title
    );
    for (href, text) in links {
        html.push_str(&format!(
            "    <a href=\"{}\">{}</a><br/>\n",
            escape(href.as_str()),
            escape(text.as_str())
        ));
    }
    html.push_str("  </body>\n</html>\n");
    html
}

/// The `/simple/` root: one link per package.
pub(crate) fn render_index(names: &[String]) -> String {
    page(
        "Simple index",
        names.iter().map(|name| {
            (
                format!("/simple/{}/", urlencoding::encode(name.as_str())),
                name.clone(),
            )
        }),
    )
}

/// `/simple/{name}/`: one link per distribution file.
pub(crate) fn render_package(name: &str, files: &[FileLink]) -> String {
    page(
        format!("Links for {}", name).as_str(),
        files
            .iter()
            .map(|file| (file.href.clone(), file.filename.clone())),
    )
}
