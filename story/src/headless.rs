//! Headless reader for stories.
//!
//! This module provides a simple text-based interface for reading a story
//! without a UI. It's designed for scripted play-throughs and agents.

use std::io::{BufRead, Write};
use story_core::{Background, Reader, Step, Studio};

/// Read a story over a line-oriented protocol.
///
/// - A number picks that choice (counting from 1)
/// - Lines starting with `#` are commands (restart, path, help, quit)
/// - All other output is story text or reader state
pub async fn run_reader<R: BufRead, W: Write>(
    studio: &Studio,
    title: &str,
    mut reader: Reader,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    writeln!(out, "=== {title} ===")?;
    print_help(out)?;
    writeln!(out)?;
    show(studio, &reader, out).await?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.trim() {
                "quit" | "exit" => {
                    writeln!(out, "Goodbye!")?;
                    break;
                }
                "restart" => {
                    reader.restart();
                    show(studio, &reader, out).await?;
                }
                "path" => {
                    let path: Vec<String> = reader.path().iter().map(ToString::to_string).collect();
                    writeln!(out, "[PATH] {}", path.join(" -> "))?;
                }
                "help" => print_help(out)?,
                _ => writeln!(out, "[ERROR] Unknown command. Type #help for help.")?,
            }
            out.flush()?;
            continue;
        }

        let index = match line.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                writeln!(out, "[ERROR] Enter a choice number, or #help")?;
                continue;
            }
        };
        match reader.choose(index).map(|_| ()) {
            Ok(()) => show(studio, &reader, out).await?,
            Err(e) => writeln!(out, "[ERROR] {e}")?,
        }
        out.flush()?;
    }

    Ok(())
}

fn print_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  <n>       - Take choice n")?;
    writeln!(out, "  #restart  - Back to the first page")?;
    writeln!(out, "  #path     - Show the pages visited")?;
    writeln!(out, "  #help     - Show this help")?;
    writeln!(out, "  #quit     - Stop reading")
}

/// Print the reader's current page.
async fn show<W: Write>(studio: &Studio, reader: &Reader, out: &mut W) -> anyhow::Result<()> {
    let view = match reader.step() {
        Step::Page(view) => view,
        Step::InvalidStep(id) => {
            writeln!(out, "[INVALID STEP] Page {id} does not exist. Type #restart to start over.")?;
            return Ok(());
        }
    };

    writeln!(out, "[PAGE {}]", view.id)?;
    match studio.resolve_background(reader).await {
        Ok(None) => {}
        Ok(Some(Background::External(url))) => writeln!(out, "[BACKGROUND] {url}")?,
        Ok(Some(Background::Stored { id, image })) => writeln!(
            out,
            "[BACKGROUND] {} ({}, {} bytes)",
            studio.image_url(&id),
            image.content_type,
            image.bytes.len()
        )?,
        Err(e) => writeln!(out, "[BACKGROUND] unavailable: {e}")?,
    }
    for para in view.text().split("\n\n") {
        writeln!(out, "{para}")?;
    }

    if view.is_dead_end() {
        writeln!(out, "[THE END]")?;
    } else {
        for (n, label) in view.labels().enumerate() {
            writeln!(out, "  {}. {label}", n + 1)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use story_core::testing::{dangling_story, looping_story};
    use story_core::StudioConfig;

    async fn play(reader: Reader, script: &str) -> String {
        let studio = Studio::in_memory(StudioConfig::default());
        let mut out = Vec::new();
        run_reader(&studio, "Test", reader, Cursor::new(script.to_string()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_play_to_the_end() {
        let output = play(Reader::new(looping_story()), "1\n1\n2\n#path\n1\n").await;
        assert!(output.contains("=== Test ==="));
        assert!(output.contains("  1. Go down"));
        assert!(output.contains("[PAGE 2]"));
        assert!(output.contains("Outside. The end.\n[THE END]"));
        assert!(output.contains("[PATH] 1 -> 2 -> 1 -> 3"));
        assert!(output.contains("[ERROR] Page 3 is the end of the story"));
    }

    #[tokio::test]
    async fn test_invalid_step_and_restart() {
        let output = play(Reader::new(dangling_story()), "1\n#restart\n#quit\n1\n").await;
        assert!(output.contains("[INVALID STEP] Page 99 does not exist"));
        assert_eq!(output.matches("[PAGE 1]").count(), 2);
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_bad_input() {
        let output = play(Reader::new(looping_story()), "zero\n0\n9\n#dance\n").await;
        assert_eq!(output.matches("[ERROR] Enter a choice number").count(), 2);
        assert!(output.contains("has no choice 8"));
        assert!(output.contains("[ERROR] Unknown command"));
    }
}
