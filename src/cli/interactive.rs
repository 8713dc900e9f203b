use anyhow::Result;
use console::style;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::output::debug_panel;
use crate::pipeline::GistPipeline;
use crate::session::{Session, SessionKey};
use crate::utils::{format_file_size, now_in_offset};
use crate::GistError;

const HELP: &str = "\
Paste a Now link to generate a gist. Commands:
  :audio [DIR]   save the last mp3 (current directory by default)
  :gist          print the last gist again
  :debug         show selected metadata of the last run
  :stt on|off    toggle speech-to-text
  :clear         drop all results and their working directory
  :help          show this help
  :quit          leave";

/// Read links and commands from `input` until EOF or `:quit`
pub async fn run<R, W>(
    pipeline: &GistPipeline,
    mut transcribe: bool,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "{} {}", style("Now Gist").bold(), style(now_in_offset(pipeline.offset())).dim())?;
    writeln!(out, "Speech-to-text: {}. Type :help for commands.", on_off(transcribe))?;

    let mut session: Option<Session> = None;
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            ":q" | ":quit" | ":exit" => break,
            ":help" | ":h" => writeln!(out, "{HELP}")?,
            ":stt" => match arg {
                "on" => transcribe = true,
                "off" => transcribe = false,
                _ => writeln!(out, "Speech-to-text is {}; use :stt on|off", on_off(transcribe))?,
            },
            ":clear" => {
                if let Some(session) = session.as_mut() {
                    session.clear_results();
                }
                writeln!(out, "Results cleared.")?;
            }
            ":gist" => match session.as_ref().and_then(|s| s.text(SessionKey::GistText)) {
                Some(gist) => writeln!(out, "{gist}")?,
                None => writeln!(out, "No gist yet.")?,
            },
            ":debug" => match session.as_ref().and_then(|s| s.metadata()) {
                Some(meta) => writeln!(out, "{}", serde_json::to_string_pretty(&debug_panel(meta))?)?,
                None => writeln!(out, "No metadata yet.")?,
            },
            ":audio" => {
                let dir = if arg.is_empty() { Path::new(".") } else { Path::new(arg) };
                save_audio(session.as_ref(), dir, out).await?;
            }
            other if other.starts_with(':') => {
                writeln!(out, "{} unknown command {other}; type :help", style("!").yellow())?;
            }
            _ => {
                let session = session.get_or_insert_with(|| {
                    let session = Session::new();
                    tracing::debug!("Started session {}", session.id());
                    session
                });
                generate(pipeline, session, line, transcribe, out).await?;
            }
        }
    }

    Ok(())
}

async fn generate<W: Write>(
    pipeline: &GistPipeline,
    session: &mut Session,
    url: &str,
    transcribe: bool,
    out: &mut W,
) -> Result<()> {
    match pipeline.generate(url, transcribe).await {
        Ok(report) => {
            for warning in &report.warnings {
                writeln!(out, "{} {warning}", style("warning:").yellow())?;
            }
            writeln!(out, "\n{}\n", report.gist_text)?;
            writeln!(out, "{} :audio saves {}", style("done.").green(), report.mp3_name)?;
            session.record_report(report);
        }
        Err(e) => {
            report_error(&e, out)?;
            session.record_error(&e);
        }
    }
    Ok(())
}

async fn save_audio<W: Write>(session: Option<&Session>, dir: &Path, out: &mut W) -> Result<()> {
    let Some(session) = session else {
        writeln!(out, "No audio yet.")?;
        return Ok(());
    };

    match session.audio().await {
        Ok(Some(audio)) => {
            let path = audio.save_into(dir).await?;
            writeln!(out, "Saved {} ({})", path.display(), format_file_size(audio.bytes.len() as u64))?;
        }
        Ok(None) => writeln!(out, "No audio yet.")?,
        Err(e) => report_error(&e, out)?,
    }
    Ok(())
}

/// Print a classified error, with a hint for the missing-output case
pub fn report_error<W: Write>(error: &GistError, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{} {}", style("error:").red().bold(), error.classified())?;
    if matches!(error, GistError::OutputMissing { .. } | GistError::ToolNotFound { .. }) {
        writeln!(out, "  hint: install ffmpeg and yt-dlp on this host, then run `now-gist check`")?;
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
