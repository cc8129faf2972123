use sidenote_anchor::{
    AnchorError, Document, Highlighter, HostSurface, HtmlDocument, HtmlSurface, Locator,
    HIGHLIGHT_TINT,
};
use sidenote_core::HIGHLIGHT_DURATION;
use std::time::Instant;

const THREAD: &str = r#"<!doctype html>
<html><body>
  <div id="conversation">
    <article><p>Sure. One Two Three Four Five Six is the sequence you asked about.</p></article>
    <article><p style="background: white">Later reply mentioning One Two Three Four Five again.</p></article>
  </div>
  <aside id="sidenote-panel">
    <ul><li>One Two Three Four Five Six Seven</li></ul>
  </aside>
</body></html>"#;

const PANEL_FIRST: &str = r#"<html><body>
  <aside id="sidenote-panel"><p>rate limits reset every hour on the hour</p></aside>
  <main><p>The docs say rate limits reset every hour.</p></main>
</body></html>"#;

#[test]
fn locates_first_match_outside_panel_and_reverts() {
    let document = HtmlDocument::parse(THREAD);
    let mut surface = HtmlSurface::new(&document);
    let mut highlighter = Highlighter::new();
    let locator = Locator::new();
    let now = Instant::now();

    let found = locator
        .locate(
            &document,
            &mut surface,
            &mut highlighter,
            "One Two Three Four Five Six Seven",
            now,
        )
        .expect("match in thread");
    assert_eq!(found.phrase, "One Two Three Four Five");
    assert!(found.text.starts_with("Sure."));
    assert_eq!(document.ancestor_ids(&found.element), vec!["conversation"]);
    assert_eq!(surface.scrolled(), &[found.element]);
    assert_eq!(
        surface.background(&found.element).as_deref(),
        Some(HIGHLIGHT_TINT)
    );

    assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION, &mut surface), 1);
    assert_eq!(surface.background(&found.element), None);
    assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION * 2, &mut surface), 0);
}

#[test]
fn identical_text_inside_panel_is_ignored() {
    let document = HtmlDocument::parse(PANEL_FIRST);
    let locator = Locator::new();

    let found = locator
        .find(&document, "rate limits reset every hour on the hour")
        .expect("match outside panel");
    assert!(found.text.starts_with("The docs say"));

    let only_panel = HtmlDocument::parse(
        r#"<div id="sidenote-panel"><p>only in the panel here</p></div>"#,
    );
    assert_eq!(
        locator.find(&only_panel, "only in the panel here"),
        Err(AnchorError::AnchorNotFound)
    );
}

#[test]
fn prior_inline_background_is_restored() {
    let document = HtmlDocument::parse(THREAD);
    let target = document
        .text_nodes()
        .into_iter()
        .find(|node| node.text.starts_with("Later reply"))
        .expect("second reply")
        .element;
    let mut surface = HtmlSurface::new(&document);
    let mut highlighter = Highlighter::new();
    let now = Instant::now();

    highlighter.highlight(&mut surface, &target, now);
    assert_eq!(surface.background(&target).as_deref(), Some(HIGHLIGHT_TINT));
    highlighter.tick(now + HIGHLIGHT_DURATION, &mut surface);
    assert_eq!(surface.background(&target).as_deref(), Some("white"));
}

#[test]
fn detached_match_is_not_reverted() {
    let document = HtmlDocument::parse(THREAD);
    let mut surface = HtmlSurface::new(&document);
    let mut highlighter = Highlighter::new();
    let now = Instant::now();

    let found = Locator::new()
        .locate(&document, &mut surface, &mut highlighter, "Later reply mentioning", now)
        .expect("match");
    surface.detach(found.element);
    assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION, &mut surface), 0);
    assert_eq!(highlighter.pending(), 0);
    assert_eq!(
        surface.background(&found.element).as_deref(),
        Some(HIGHLIGHT_TINT)
    );
}

#[test]
fn title_sharing_the_phrase_does_not_win() {
    let document = HtmlDocument::parse(
        r#"<html><head><title>Rate limits reset every hour discussion</title></head>
        <body><main><p>Rate limits reset every hour on the free tier.</p></main></body></html>"#,
    );
    let found = Locator::new()
        .find(&document, "Rate limits reset every hour")
        .expect("match in body");
    assert_eq!(document.describe(found.element), "p");
    assert!(found.text.ends_with("free tier."));
}
