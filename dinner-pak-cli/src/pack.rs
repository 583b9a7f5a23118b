use std::{collections::HashSet, sync::LazyLock, time::Duration};

use anyhow::Context;
use dinner_pak_core::{
    ResourcePackBuilder, StoryPackBuilder,
    resource::{ResourceManifest, Source},
    story::StoryScript,
    write::{self, PackOptions},
};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

use crate::{PackResourcesCommand, PackStoryCommand};

static NON_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

pub fn pack_resources(cmd: &PackResourcesCommand) -> anyhow::Result<()> {
    let manifest = if let Some(manifest) = &cmd.input.manifest {
        ResourceManifest::from_path(manifest).context(format!("Failed to load manifest `{manifest}`"))?
    } else if let Some(dir) = &cmd.input.dir {
        ResourceManifest::from_dir(dir).context(format!("Failed to scan input directory `{dir}`"))?
    } else {
        anyhow::bail!("Either --manifest or --dir is required");
    };
    if manifest.sources.is_empty() {
        anyhow::bail!("No input files found");
    }

    // fail on bad constant names before anything is written
    let index_module = match &cmd.index_module {
        Some(path) => Some((path, index_module_source(&manifest.sources)?)),
        None => None,
    };

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} elapsed: {elapsed}")?);
    bar.set_message(format!("Reading {} resources", manifest.sources.len()));
    bar.enable_steady_tick(Duration::from_millis(100));
    let builder = ResourcePackBuilder::from_manifest(&manifest);
    bar.finish_and_clear();
    let builder = builder.context("Failed to read resources")?;

    let options = PackOptions::new().overwrite(cmd.r#override);
    builder
        .write(&cmd.output, &options)
        .context(format!("Failed to write `{}`", cmd.output))?;

    if let Some((path, module)) = index_module {
        write::write_file(path, module.as_bytes(), &options).context(format!("Failed to write `{path}`"))?;
        println!("Index module: {path}");
    }

    println!("Output file: {}", cmd.output);
    println!("Done!");
    Ok(())
}

pub fn pack_story(cmd: &PackStoryCommand) -> anyhow::Result<()> {
    let script = StoryScript::from_path(&cmd.script).context(format!("Failed to load script `{}`", cmd.script))?;
    let builder = StoryPackBuilder::from_script(&script).context("Failed to pack story")?;
    let actions = builder.action_count();

    let options = PackOptions::new().overwrite(cmd.r#override);
    builder
        .write(&cmd.output, &options)
        .context(format!("Failed to write `{}`", cmd.output))?;

    println!(
        "Packed {} images, {} music tracks, {} actions",
        script.images.len(),
        script.music.len(),
        actions
    );
    println!("Output file: {}", cmd.output);
    Ok(())
}

/// `ui/Main Font.ttf` becomes `UI_MAIN_FONT_TTF`.
fn const_name(resource_name: &str) -> String {
    let name = NON_IDENT.replace_all(resource_name, "_").to_uppercase();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name
    }
}

/// Rust source declaring each resource's index as a constant.
fn index_module_source(sources: &[Source]) -> anyhow::Result<String> {
    let mut seen = HashSet::new();
    let mut out = String::from("// Generated by dinner-pak. Do not edit.\n\n");
    for (index, source) in sources.iter().enumerate() {
        let name = const_name(&source.name);
        if name.is_empty() {
            anyhow::bail!("Resource `{}` has no name to derive a constant from", source.name);
        }
        if !seen.insert(name.clone()) {
            anyhow::bail!("Resource `{}` maps to duplicate constant `{name}`", source.name);
        }
        out.push_str(&format!("pub const {name}: u32 = {index};\n"));
    }
    Ok(out)
}
