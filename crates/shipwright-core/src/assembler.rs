//! Deterministic artifact assembly.
//!
//! Produces the staged file set for a deployment: entry page, readme,
//! license, plus the materialized attachments. Pure: the same inputs always
//! yield byte-identical output, which is what makes force-push replays safe.

use crate::attachments::MaterializedAttachment;
use crate::domain::StagedFileSet;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Assemble the full file set for one deployment.
pub fn assemble(
    task: &str,
    brief: &str,
    attachments: &[MaterializedAttachment],
    owner: &str,
) -> StagedFileSet {
    let mut files = StagedFileSet::new();
    files.insert("index.html", render_index(task, brief, attachments));
    files.insert("README.md", render_readme(task, brief));
    files.insert("LICENSE", render_license(owner));
    for attachment in attachments {
        files.insert(attachment.name.clone(), attachment.bytes.clone());
    }
    files
}

fn render_index(task: &str, brief: &str, attachments: &[MaterializedAttachment]) -> String {
    let mut attachment_markup = String::new();
    if !attachments.is_empty() {
        attachment_markup.push_str("    <section>\n      <h2>Attachments</h2>\n");
        for attachment in attachments {
            let name = escape_html(&attachment.name);
            if is_image(&attachment.name) {
                attachment_markup
                    .push_str(&format!("      <figure><img src=\"{name}\" alt=\"{name}\"><figcaption>{name}</figcaption></figure>\n"));
            } else {
                attachment_markup.push_str(&format!("      <p><a href=\"{name}\">{name}</a></p>\n"));
            }
        }
        attachment_markup.push_str("    </section>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n  <head>\n    <meta charset=\"utf-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n    \
         <title>{title}</title>\n  </head>\n  <body>\n    <h1>{title}</h1>\n    \
         <p>{brief}</p>\n{attachments}  </body>\n</html>\n",
        title = escape_html(task),
        brief = escape_html(brief),
        attachments = attachment_markup,
    )
}

fn render_readme(task: &str, brief: &str) -> String {
    format!(
        "# {task}\n\nThis site was generated and deployed automatically in response to the \
         following brief:\n\n> *\"{brief}\"*\n\nThe repository is managed by a deployment \
         pipeline; its content is replaced wholesale on every round.\n"
    )
}

fn render_license(owner: &str) -> String {
    format!(
        "MIT License\n\nCopyright (c) 2025 {owner}\n\nPermission is hereby granted, free of charge, to any person obtaining a copy\n\
of this software and associated documentation files (the \"Software\"), to deal\n\
in the Software without restriction, including without limitation the rights\n\
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell\n\
copies of the Software, and to permit persons to whom the Software is\n\
furnished to do so, subject to the following conditions:\n\n\
The above copyright notice and this permission notice shall be included in all\n\
copies or substantial portions of the Software.\n\n\
THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR\n\
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,\n\
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE\n\
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER\n\
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,\n\
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE\n\
SOFTWARE.\n"
    )
}

fn is_image(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
