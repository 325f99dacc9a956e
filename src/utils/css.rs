//! Stylesheets: the external CSS build step and the code highlight theme.

use crate::content::CLASS_STYLE;
use crate::context::{BuildContext, CssStep, HighlightStep};
use crate::exec;
use crate::utils::exec::FilterRule;
use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use syntect::{highlighting::ThemeSet, html::css_for_theme_with_class_style};

/// Tailwind filter: skip version banner in output.
pub static TAILWIND_FILTER: FilterRule = FilterRule::new(&["≈ tailwindcss"]);

/// Run the configured CSS command, writing into the output root.
pub fn run_css_command(step: &CssStep, ctx: &BuildContext) -> Result<PathBuf> {
    let output = ctx.output_root.join(&step.output);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    exec!(
        filter=&TAILWIND_FILTER;
        &ctx.root;
        &step.command;
        "-i", &step.input, "-o", &output,
        if ctx.minify { "--minify" } else { "" }
    )?;

    Ok(output)
}

/// Stylesheet for the `syntax-*` classes emitted by the Markdown renderer.
pub fn highlight_css(theme: &str) -> Result<String> {
    let themes = ThemeSet::load_defaults();
    let theme = themes.themes.get(theme).with_context(|| {
        let known: Vec<_> = themes.themes.keys().map(String::as_str).collect();
        format!("unknown highlight theme `{theme}`, expected one of: {}", known.join(", "))
    })?;

    Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
}

pub fn write_highlight_css(step: &HighlightStep, ctx: &BuildContext) -> Result<PathBuf> {
    let output = ctx.output_root.join(&step.path);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, highlight_css(&step.theme)?)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_css_uses_prefixed_classes() {
        let css = highlight_css("InspiredGitHub").unwrap();
        assert!(css.contains(".syntax-"));
    }

    #[test]
    fn test_unknown_theme() {
        let err = highlight_css("NoSuchTheme").unwrap_err();
        assert!(err.to_string().contains("NoSuchTheme"));
    }
}
