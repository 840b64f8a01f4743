//! Template rendering on minijinja.
//!
//! Templates are looked up by name in the same ordered candidate
//! directories the static resolver uses. Rendering never fails from the
//! caller's point of view: problems come back as a diagnostic string that
//! ends up in the page, which is what handlers return anyway.

use std::fs;
use std::path::PathBuf;

use minijinja::{Environment, ErrorKind};
use serde::Serialize;

use crate::static_files::find_file;

/// Renders named templates found in a list of candidate directories.
pub struct TemplateRenderer {
    env: Environment<'static>,
    candidate_dirs: Vec<PathBuf>,
}

impl TemplateRenderer {
    pub fn new(candidate_dirs: Vec<PathBuf>) -> Self {
        let mut env = Environment::new();
        let dirs = candidate_dirs.clone();
        env.set_loader(move |name| {
            let Some(path) = find_file(name, &dirs) else {
                return Ok(None);
            };
            fs::read_to_string(&path).map(Some).map_err(|e| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {}", path.display()),
                )
                .with_source(e)
            })
        });
        Self { env, candidate_dirs }
    }

    pub fn candidate_dirs(&self) -> &[PathBuf] {
        &self.candidate_dirs
    }

    /// The underlying environment, for registering filters and globals.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    /// Render template `name` with `vars`.
    pub fn render<S: Serialize>(&self, name: &str, vars: S) -> String {
        let template = match self.env.get_template(name) {
            Ok(template) => template,
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                tracing::warn!(template = %name, "Template not found");
                return format!("ERROR: render_template - Failed to find {name}");
            }
            Err(e) => return render_error(name, &e),
        };
        template.render(vars).unwrap_or_else(|e| render_error(name, &e))
    }

    /// Raw content of `name`, without template processing.
    pub fn render_html_file(&self, name: &str) -> String {
        render_html_file(name, &self.candidate_dirs)
    }
}

fn render_error(name: &str, error: &minijinja::Error) -> String {
    tracing::warn!(template = %name, error = %error, "Template render failed");
    format!("ERROR: render_template - {error}")
}

/// Raw content of the first file named `name` in `dirs`.
pub fn render_html_file(name: &str, dirs: &[PathBuf]) -> String {
    find_file(name, dirs)
        .and_then(|path| fs::read_to_string(path).ok())
        .unwrap_or_else(|| format!("ERROR: render_html_file - Failed to find {name}"))
}
