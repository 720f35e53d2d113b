//! Toolchain command templates.

use std::path::Path;

use snipcheck_core::CompileMode;

use crate::config::ToolchainConfig;

use super::ExecError;

/// Values substituted into a command template.
pub struct TemplateVars<'a> {
    pub source: &'a Path,
    pub out_dir: &'a Path,
    pub stem: &'a str,
    pub mode: CompileMode,
}

/// Expand a command template into an argv.
///
/// `{mode_flags}` must be a whole argument; it expands to zero or more arguments.
pub fn expand(template: &[String], toolchain: &ToolchainConfig, vars: &TemplateVars<'_>) -> Result<Vec<String>, ExecError> {
    let source = vars.source.to_string_lossy();
    let out_dir = vars.out_dir.to_string_lossy();

    let mut argv = Vec::with_capacity(template.len() + 2);
    for arg in template {
        if arg == "{mode_flags}" {
            let flags = match vars.mode {
                CompileMode::Strict => &toolchain.strict_flags,
                CompileMode::Loose => &toolchain.loose_flags,
            };
            argv.extend(flags.iter().cloned());
            continue;
        }
        argv.push(
            arg.replace("{source}", &source)
                .replace("{out_dir}", &out_dir)
                .replace("{stem}", vars.stem),
        );
    }

    match argv.first() {
        Some(program) if !program.trim().is_empty() => Ok(argv),
        _ => Err(ExecError::EmptyCommand(template.join(" "))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn vars(mode: CompileMode) -> TemplateVars<'static> {
        TemplateVars {
            source: Path::new("/tmp/s/snippet.ts"),
            out_dir: Path::new("/tmp/s/out"),
            stem: "snippet",
            mode,
        }
    }

    #[test]
    fn test_default_compile_template_strict() {
        let toolchain = ToolchainConfig::default();
        let argv = expand(&toolchain.compile, &toolchain, &vars(CompileMode::Strict)).unwrap();
        assert_eq!(argv.first().map(String::as_str), Some("tsc"));
        assert!(argv.contains(&"--strict".to_string()));
        assert!(argv.windows(2).any(|pair| pair == ["--moduleDetection", "force"]));
        assert_eq!(argv.last().map(String::as_str), Some("/tmp/s/snippet.ts"));
    }

    #[test]
    fn test_mode_flags_expand_to_nothing_when_loose() {
        let toolchain = ToolchainConfig::default();
        let argv = expand(&strings(&["tsc", "{mode_flags}", "{source}"]), &toolchain, &vars(CompileMode::Loose)).unwrap();
        assert_eq!(argv, strings(&["tsc", "/tmp/s/snippet.ts"]));
    }

    #[test]
    fn test_placeholders_inside_arguments() {
        let toolchain = ToolchainConfig::default();
        let argv = expand(&toolchain.run, &toolchain, &vars(CompileMode::Loose)).unwrap();
        assert_eq!(argv, strings(&["node", "/tmp/s/out/snippet.js"]));
    }

    #[test]
    fn test_empty_program_rejected() {
        let toolchain = ToolchainConfig::default();
        let err = expand(&strings(&["{mode_flags}"]), &toolchain, &vars(CompileMode::Loose)).unwrap_err();
        assert!(matches!(err, ExecError::EmptyCommand(_)));
    }
}
