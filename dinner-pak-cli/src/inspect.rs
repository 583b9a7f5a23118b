use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use dinner_pak_core::{
    ResourcePack, StoryPack,
    data::Table,
    story::Action,
    write::{self, PackOptions},
};
use serde::Serialize;

use crate::{ExtractCommand, ListCommand, ReadCommand, VerifyCommand};

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    index: usize,
    name: &'a str,
    size: usize,
}

fn open_resources(input: &str) -> anyhow::Result<ResourcePack> {
    ResourcePack::open(input).context(format!("Failed to open resource pack `{input}`"))
}

fn open_story(input: &str) -> anyhow::Result<StoryPack> {
    StoryPack::open(input).context(format!("Failed to open story pack `{input}`"))
}

pub fn list(cmd: &ListCommand) -> anyhow::Result<()> {
    let pack = open_resources(&cmd.input)?;
    let entries: Vec<ListEntry<'_>> = pack
        .iter()
        .enumerate()
        .map(|(index, resource)| ListEntry {
            index,
            name: resource.name,
            size: resource.data.len(),
        })
        .collect();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in &entries {
        println!("{:>5}  {:<width$}  {:>10}", entry.index, entry.name, entry.size);
    }
    println!("{} resources", entries.len());
    Ok(())
}

/// Last `/`-separated segment of a resource name.
fn default_output(name: &str) -> PathBuf {
    let file_name = name.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("resource.bin");
    Path::new(".").join(file_name)
}

pub fn extract(cmd: &ExtractCommand) -> anyhow::Result<()> {
    let pack = open_resources(&cmd.input)?;
    let data = pack
        .get(cmd.name.as_str())
        .context(format!("Resource `{}` not found in `{}`", cmd.name, cmd.input))?;

    let output = cmd
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output(&cmd.name));
    write::write_file(&output, data, &PackOptions::new().overwrite(true))
        .context(format!("Failed to write `{}`", output.display()))?;

    println!("Extracted {} bytes to {}", data.len(), output.display());
    Ok(())
}

fn describe(pack: &StoryPack, action: &Action<'_>) -> String {
    match action {
        Action::ShowImage(image) => match pack.images().names().get(image.image_index as usize) {
            Some(name) => format!("[image: {name}]"),
            None => action.to_string(),
        },
        Action::PlayMusic(music) => match pack.music().names().get(music.music_index as usize) {
            Some(name) => format!("[music: {name}]"),
            None => action.to_string(),
        },
        Action::ShowText(_) => action.to_string(),
    }
}

pub fn read(cmd: &ReadCommand) -> anyhow::Result<()> {
    let pack = open_story(&cmd.input)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    let mut cursor = pack.cursor();
    while !cursor.is_finished() {
        let action = cursor
            .current()
            .context(format!("Corrupt action {}", cursor.position()))?;
        writeln!(stdout, "{}", describe(&pack, &action))?;

        if cmd.interactive && matches!(action, Action::ShowText(_)) {
            stdout.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
        }
        cursor.advance();
    }
    Ok(())
}

pub fn verify(cmd: &VerifyCommand) -> anyhow::Result<()> {
    let pack = open_story(&cmd.input)?;
    pack.verify().context(format!("`{}` is corrupt", cmd.input))?;
    println!(
        "OK: {} actions, {} images, {} music tracks, {} characters",
        pack.len(),
        pack.images().len(),
        pack.music().len(),
        pack.character_names().len()
    );
    Ok(())
}
