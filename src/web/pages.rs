//! HTML pages of the demo service.

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{TITLE}}</title>
</head>
<body>
    <form method="post" action="/">
        <div><img src="{{IMAGE_PATH}}" width="{{WIDTH}}" height="{{HEIGHT}}" alt="CAPTCHA"></div>
        <label>Code: <input type="text" name="code" autocomplete="off" autofocus></label>
        <input type="submit" name="test" value="Check">
        <input type="submit" name="reload" value="Reload">
    </form>
</body>
</html>
"#;

const RESULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{TITLE}}</title>
</head>
<body>
    <div style="font-family:monospace;">
        Code entered: <strong>{{CODE}}</strong><br>
        <strong>Result</strong>: <span style="color:{{COLOR}}">{{RESULT}}</span>
    </div><br>
    <form method="get" action="/">
        <input type="submit" value="Reload">
    </form>
</body>
</html>
"#;

const TITLE: &str = "WaveCaptcha";

/// Renders the challenge form around an image served from `image_path`.
#[must_use]
pub fn index_page(image_path: &str, width: u32, height: u32) -> String {
    INDEX_TEMPLATE
        .replace("{{TITLE}}", TITLE)
        .replace("{{IMAGE_PATH}}", image_path)
        .replace("{{WIDTH}}", &width.to_string())
        .replace("{{HEIGHT}}", &height.to_string())
}

/// Renders the verdict for a submitted code.
#[must_use]
pub fn result_page(code: &str, passed: bool) -> String {
    let (color, result) = if passed {
        ("#00CC00", "OK!")
    } else {
        ("#CC0000", "KO...")
    };
    RESULT_TEMPLATE
        .replace("{{TITLE}}", TITLE)
        .replace("{{COLOR}}", color)
        .replace("{{RESULT}}", result)
        .replace("{{CODE}}", &escape_html(code))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
