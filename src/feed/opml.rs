use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::{self, OpenOptions};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One subscription in the exported document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpmlFeed {
    /// Display title, written to both `text` and `title`
    pub title: String,
    /// URL of the RSS/Atom feed
    pub xml_url: String,
    /// URL of the site the feed belongs to
    pub html_url: Option<String>,
}

/// Renders subscriptions as a pretty-printed OPML 2.0 document.
///
/// Each feed becomes a self-closing `<outline type="rss">` with `text`,
/// `title`, `xmlUrl` and, when known, `htmlUrl`. Attribute and text values
/// are XML-escaped by the writer.
///
/// # Arguments
///
/// * `feeds` - Subscriptions in output order
/// * `title` - Contents of `<head><title>`
pub fn export_opml(feeds: &[OpmlFeed], title: &str) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(opml))
        .context("Failed to write opml element")?;

    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .context("Failed to write head element")?;
    write_text_element(&mut writer, "title", title)?;
    write_text_element(
        &mut writer,
        "dateCreated",
        &chrono::Utc::now().to_rfc2822(),
    )?;
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .context("Failed to write head end")?;

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .context("Failed to write body element")?;

    for feed in feeds {
        let mut outline = BytesStart::new("outline");
        outline.push_attribute(("type", "rss"));
        outline.push_attribute(("text", feed.title.as_str()));
        outline.push_attribute(("title", feed.title.as_str()));
        outline.push_attribute(("xmlUrl", feed.xml_url.as_str()));
        if let Some(ref html_url) = feed.html_url {
            outline.push_attribute(("htmlUrl", html_url.as_str()));
        }
        writer
            .write_event(Event::Empty(outline))
            .context("Failed to write outline element")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .context("Failed to write body end")?;
    writer
        .write_event(Event::End(BytesEnd::new("opml")))
        .context("Failed to write opml end")?;

    let mut document = String::from_utf8(writer.into_inner().into_inner())
        .context("Generated OPML contains invalid UTF-8")?;
    document.push('\n');
    Ok(document)
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

/// Writes the OPML document to `path` atomically.
///
/// A reader of `path` sees either the previous file or the complete new
/// document, never a partial write.
pub fn export_to_file(feeds: &[OpmlFeed], title: &str, path: &Path) -> Result<()> {
    let document = export_opml(feeds, title)?;
    StagedFile::write(path, document.as_bytes())?.commit()
}

/// Fully written and synced sibling of a destination file.
///
/// Removed on drop unless [`StagedFile::commit`] moved it into place.
struct StagedFile<'a> {
    target: &'a Path,
    temp_path: PathBuf,
    committed: bool,
}

impl<'a> StagedFile<'a> {
    fn write(target: &'a Path, contents: &[u8]) -> Result<Self> {
        let temp_path = staging_path(target)?;

        // create_new refuses to open anything already at the staging path
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create '{}'", temp_path.display()))?;

        let staged = Self {
            target,
            temp_path,
            committed: false,
        };
        file.write_all(contents)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write '{}'", staged.temp_path.display()))?;
        Ok(staged)
    }

    fn commit(mut self) -> Result<()> {
        fs::rename(&self.temp_path, self.target).with_context(|| {
            format!(
                "Failed to move '{}' into place at '{}'",
                self.temp_path.display(),
                self.target.display()
            )
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Hidden, per-process name next to `target`, e.g. `.friends.opml.1234-5f3a.tmp`.
fn staging_path(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .with_context(|| format!("Output path '{}' has no file name", target.display()))?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Ok(target.with_file_name(format!(
        ".{}.{}-{:x}.tmp",
        name.to_string_lossy(),
        std::process::id(),
        nanos
    )))
}
