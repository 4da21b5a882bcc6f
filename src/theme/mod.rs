//! Theme engine
//!
//! This module provides template rendering using Tera.
//! Features:
//! - Built-in templates embedded in the binary
//! - Per-template overrides from a directory on disk (`theme.path`)
//! - Site variables injected into every page
//! - Fallback to the error template or plain HTML when rendering fails

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::config::Config;

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct BuiltinTemplates;

/// Site-wide values available to every template as `site`
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteVars {
    pub name: String,
    pub tagline: String,
    pub about: String,
    /// Owner address shown on the contact page, if mail is configured
    pub contact_email: Option<String>,
}

impl SiteVars {
    pub fn from_config(config: &Config) -> Self {
        let owner = config.mail.owner();
        Self {
            name: config.blog.site_name.clone(),
            tagline: config.blog.tagline.clone(),
            about: config.blog.about.clone(),
            contact_email: (!owner.is_empty()).then(|| owner.to_string()),
        }
    }
}

/// Theme engine for rendering pages
pub struct ThemeEngine {
    tera: Tera,
    site: SiteVars,
}

impl ThemeEngine {
    /// Load the built-in templates, replacing any that exist in `override_dir`
    pub fn new(override_dir: Option<&Path>, site: SiteVars) -> Result<Self> {
        let mut templates = builtin_templates()?;

        if let Some(dir) = override_dir {
            if !dir.is_dir() {
                return Err(ThemeError::NotFound(dir.to_path_buf()).into());
            }
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            for (name, content) in overrides {
                tracing::debug!("Template override: {}", name);
                templates.insert(name, content);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.into_iter())
            .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", e)))?;

        Ok(Self { tera, site })
    }

    /// Engine with only the built-in templates
    pub fn builtin(site: SiteVars) -> Result<Self> {
        Self::new(None, site)
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(error_msg).into()
        })
    }

    /// Render a page with `site` and `year` added to the context
    pub fn render_page(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.render(template, &self.page_context(context))
    }

    /// Render a page, falling back to `error.html` and then to plain HTML.
    ///
    /// Always produces a document.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        let full_context = self.page_context(context);
        match self.render(template, &full_context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {:#}", template, e);

                let mut error_context = full_context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "Something went wrong.");

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {:#}, returning plain page",
                            error_template_err
                        );
                        Self::simple_error_page(template)
                    }
                }
            }
        }
    }

    fn page_context(&self, context: &TeraContext) -> TeraContext {
        let mut full_context = context.clone();
        full_context.insert("site", &self.site);
        full_context.insert("year", &chrono::Utc::now().year());
        if !full_context.contains_key("is_admin") {
            full_context.insert("is_admin", &false);
        }
        full_context
    }

    /// Last-resort page when no template renders
    fn simple_error_page(template: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Error</title></head>
<body>
    <h1>Something went wrong</h1>
    <p>The page <code>{}</code> could not be rendered.</p>
</body>
</html>"#,
            template
        )
    }
}

fn builtin_templates() -> Result<BTreeMap<String, String>> {
    let mut templates = BTreeMap::new();
    for name in BuiltinTemplates::iter() {
        let file = BuiltinTemplates::get(&name)
            .ok_or_else(|| ThemeError::TemplateError(format!("Missing embedded template {}", name)))?;
        let content = String::from_utf8(file.data.into_owned())
            .with_context(|| format!("Embedded template {} is not UTF-8", name))?;
        templates.insert(name.into_owned(), content);
    }
    Ok(templates)
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}
