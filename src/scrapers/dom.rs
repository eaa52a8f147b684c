//! Scripts evaluated in the page.
//!
//! The site hides controls behind transient overlays and loading states even when
//! they are usable. Everything that forces the DOM into an interactable shape lives
//! here so a change in the site's quirks stays out of the extraction logic.

use crate::scrapers::parse::RENDERED_ATTR;

/// JS string literal for `value`
fn literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

fn literal_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| String::from("[]"))
}

/// Styles applied to a control that must be clickable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// display, visibility, opacity
    Basic,
    /// Basic plus size and stacking, for controls collapsed to nothing
    Full,
}

impl Reveal {
    fn statements(&self) -> &'static str {
        match self {
            Reveal::Basic => {
                "el.style.display = 'block'; el.style.visibility = 'visible'; el.style.opacity = '1';"
            }
            Reveal::Full => {
                "el.style.display = 'block'; el.style.visibility = 'visible'; el.style.opacity = '1'; \
                 el.style.height = 'auto'; el.style.width = 'auto'; el.style.zIndex = '99999';"
            }
        }
    }
}

/// Force every node matching `selector` visible and drop the `blockers`.
/// Evaluates to the number of revealed nodes.
pub fn normalize_interactability(selector: &str, reveal: Reveal, blockers: &[String]) -> String {
    format!(
        r#"(() => {{
    const targets = Array.from(document.querySelectorAll({selector}));
    targets.forEach(el => {{ {styles} }});
    {blockers}.forEach(sel => document.querySelectorAll(sel).forEach(el => el.remove()));
    return targets.length;
}})()"#,
        selector = literal(selector),
        styles = reveal.statements(),
        blockers = literal_list(blockers),
    )
}

/// Unlock a read-only input, write `value` and fire the listeners the page relies on.
/// Evaluates to `false` when the field is missing.
pub fn set_locked_input(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return false;
    el.removeAttribute('readonly');
    el.value = {value};
    el.dispatchEvent(new Event('change'));
    el.dispatchEvent(new Event('input'));
    return true;
}})()"#,
        selector = literal(selector),
        value = literal(value),
    )
}

/// Choose `value` in the first node matching `selector`, after revealing all of them.
/// Evaluates to `false` when the selector is missing.
pub fn select_first_option(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
    const all = Array.from(document.querySelectorAll({selector}));
    if (all.length === 0) return false;
    all.forEach(el => {{ {styles} }});
    const el = all[0];
    el.value = {value};
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
}})()"#,
        selector = literal(selector),
        value = literal(value),
        styles = Reveal::Full.statements(),
    )
}

/// Click `selector` if present. Evaluates to whether a click happened.
pub fn click_if_present(selector: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return false;
    el.click();
    return true;
}})()"#,
        selector = literal(selector),
    )
}

/// Stamp each card with whether it has a layout box (`offsetParent`)
pub fn stamp_rendered(card_selector: &str) -> String {
    format!(
        r#"(() => {{
    const cards = document.querySelectorAll({selector});
    cards.forEach(card => card.setAttribute({attr}, card.offsetParent !== null ? '1' : '0'));
    return cards.length;
}})()"#,
        selector = literal(card_selector),
        attr = literal(RENDERED_ATTR),
    )
}

pub const BODY_TEXT: &str = "document.body ? document.body.innerText : ''";

pub const DOCUMENT_HTML: &str = "document.documentElement.outerHTML";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_embedded_as_string_literals() {
        let script = set_locked_input("#eZ_chkin", "17-10-2026");
        assert!(script.contains(r##"document.querySelector("#eZ_chkin")"##));
        assert!(script.contains(r#"el.value = "17-10-2026";"#));
        assert!(script.contains("removeAttribute('readonly')"));
        assert!(script.contains("new Event('change')"));
        assert!(script.contains("new Event('input')"));
    }

    #[test]
    fn quotes_in_values_cannot_escape_the_literal() {
        let script = click_if_present(r#"a[title="x"]'); alert(1); ('"#);
        assert!(script.contains(r#""a[title=\"x\"]'); alert(1); ('""#));
    }

    #[test]
    fn normalization_removes_each_blocker() {
        let blockers = vec![".sweet-alert".to_string(), ".loadingbar".to_string()];
        let script = normalize_interactability("#availcalmain", Reveal::Basic, &blockers);
        assert!(script.contains(r#"[".sweet-alert",".loadingbar"].forEach"#));
        assert!(script.contains("el.style.opacity = '1'"));
        assert!(!script.contains("zIndex"));
    }

    #[test]
    fn room_selection_reveals_fully() {
        let script = select_first_option("#avairoomtype", "42");
        assert!(script.contains("zIndex = '99999'"));
        assert!(script.contains("const el = all[0];"));
        assert!(script.contains(r#"el.value = "42";"#));
    }
}
