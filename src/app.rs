//! Application orchestrator.
//! Loads/merges config, initializes logging, and runs one subcommand on top
//! of the library primitives.

use anyhow::{bail, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use atomic_tmp::cli::{Args, Command};
use atomic_tmp::config::{create_template_config, load_config, resolve_config_path, Config, LoadResult};
use atomic_tmp::naming::{tempfn_random, tempfn_random_child, tempfn_xxxxxx, PathTemplate};
use atomic_tmp::output as out;
use atomic_tmp::platform::DirFd;
use atomic_tmp::secure::create_from_template;
use atomic_tmp::tmpdir::mkdtemp_with_mode;
use atomic_tmp::tmpfile::{open_tmpfile_linkable, Overwrite, PublishError, PublishOptions};
use atomic_tmp::TmpError;

use crate::logging::init_tracing;

/// Template used by `mktemp` when none is given.
const DEFAULT_TEMPLATE: &str = "tmp.XXXXXXXXXX";

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Config-location flags run before logging init.
    if args.print_config {
        let path = resolve_config_path(args.config.as_deref())?;
        out::print_user(&path.display().to_string());
        if !path.exists() {
            out::print_info("no config file there yet; run with --init-config to create a template");
        }
        return Ok(());
    }
    if args.init_config {
        let path = resolve_config_path(args.config.as_deref())?;
        create_template_config(&path)?;
        out::print_success(&format!("wrote template config to {}", path.display()));
        return Ok(());
    }

    // Config file first, then CLI overrides (CLI wins).
    let mut cfg = match load_config(args.config.as_deref())? {
        LoadResult::Loaded(cfg, _) => cfg,
        LoadResult::Missing(_) => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    let _guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).inspect_err(|e| {
        out::print_error(&format!("failed to initialize logging: {e}"));
    })?;
    debug!(?args, ?cfg, "starting atomic_tmp");

    let Some(command) = args.command else {
        bail!("no command given; run with --help");
    };

    let result = match command {
        Command::Mktemp { template, directory, .. } => mktemp(&cfg, template.as_deref(), directory),
        Command::Name { path, extra, child, placeholder } => name(&path, extra.as_deref(), child, placeholder),
        Command::Write { target, replace, no_sync, .. } => write_stdin(&cfg, &target, replace, !no_sync),
    };

    match result {
        Ok(path) => {
            out::print_user(&path.display().to_string());
            Ok(())
        }
        Err(e) => {
            report(&e);
            Err(e)
        }
    }
}

/// Process exit status for a failed run: the typed error code when there is one.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<TmpError>()
        .and_then(|e| u8::try_from(e.code()).ok())
        .unwrap_or(1)
}

fn report(e: &anyhow::Error) {
    let Some(te) = e.downcast_ref::<TmpError>() else {
        error!(error = %format!("{e:#}"), "command failed");
        return;
    };
    let code = te.code();
    match te {
        TmpError::InvalidTemplate { template, reason } => {
            error!(code, kind = "invalid_template", template = %template.display(), reason, "command failed")
        }
        TmpError::NameCollision(path) => {
            error!(code, kind = "name_collision", path = %path.display(), "command failed")
        }
        TmpError::ResourceExhausted(msg) => {
            error!(code, kind = "resource_exhausted", detail = %msg, "command failed")
        }
        TmpError::CrossDevice { from, to } => {
            error!(code, kind = "cross_device", from = %from.display(), to = %to.display(), "command failed")
        }
        TmpError::TargetExists(path) => {
            error!(code, kind = "target_exists", path = %path.display(), "command failed")
        }
        TmpError::Io { op, path, source } => {
            error!(code, kind = "io", op, path = %path.display(), error = %source, "command failed")
        }
    }
    out::print_hint(te);
}

/// A template without a directory part lands in the configured temp directory.
fn resolve_template(cfg: &Config, template: Option<&str>) -> Result<PathTemplate> {
    let raw = PathBuf::from(template.unwrap_or(DEFAULT_TEMPLATE));
    let bare = raw.parent().is_none_or(|p| p.as_os_str().is_empty());
    let full = if bare { cfg.effective_tmp_dir().join(raw) } else { raw };
    Ok(PathTemplate::parse(full)?)
}

fn mktemp(cfg: &Config, template: Option<&str>, directory: bool) -> Result<PathBuf> {
    let template = resolve_template(cfg, template)?;
    if directory {
        let path = mkdtemp_with_mode(Some(&template), cfg.dir_mode)?;
        info!(path = %path.display(), "created temp directory");
        Ok(path)
    } else {
        let (_file, path) = create_from_template(DirFd::Cwd, &template, 0, cfg.file_mode)?;
        info!(path = %path.display(), "created temp file");
        Ok(path)
    }
}

fn name(path: &Path, extra: Option<&str>, child: bool, placeholder: bool) -> Result<PathBuf> {
    let generated = if child {
        tempfn_random_child(Some(path), extra)?
    } else if placeholder {
        tempfn_xxxxxx(path, extra)?.as_path().to_path_buf()
    } else {
        tempfn_random(path, extra)?
    };
    Ok(generated)
}

/// Copy stdin into a linkable temp file next to `target`, then publish it.
/// The target is untouched until the whole input has been written.
fn write_stdin(cfg: &Config, target: &Path, replace: bool, sync: bool) -> Result<PathBuf> {
    let tmp = open_tmpfile_linkable(target, 0, cfg.file_mode)?;
    debug!(target = %target.display(), strategy = ?tmp.strategy(), "opened linkable temp file");
    let mut tmp = tmp.into_buffered();

    if let Err(e) = io::copy(&mut io::stdin().lock(), &mut tmp) {
        if let Err(rm) = tmp.discard() {
            warn!(error = %rm, "failed to discard temp file");
        }
        return Err(TmpError::io("write", target, e).into());
    }

    let opts = PublishOptions {
        overwrite: if replace { Overwrite::Replace } else { Overwrite::Refuse },
        sync,
    };
    match tmp.publish_with(target, opts) {
        Ok(published) => {
            info!(target = %published.path().display(), strategy = ?published.strategy(), "published");
            Ok(published.path().to_path_buf())
        }
        Err(PublishError { error, file }) => {
            if let Err(rm) = file.discard() {
                warn!(error = %rm, "failed to discard temp file after publish failure");
            }
            Err(error.into())
        }
    }
}
