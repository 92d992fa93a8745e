//! Render a container clip on a one-track sequence.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use montage_common::config::AppConfig;
use montage_project_model::{Clip, ClipId, Sequence};
use montage_render_engine::{
    ContainerActions, JobQueue, JobQueueMessage, JobStatus, PollOutcome, RenderCompletion,
};

use super::{load_clip, profile_for};

/// Render options from the command line.
pub struct RenderRequest {
    pub kind: String,
    pub clip_in: i64,
    pub clip_out: Option<i64>,
    pub frame: i64,
    pub frames: bool,
}

/// Prints job updates on one console line.
#[derive(Default)]
struct ConsoleJobQueue;

impl JobQueue for ConsoleJobQueue {
    fn add_job(&mut self, job: JobQueueMessage) {
        println!("  {}", job.text);
    }

    fn update_job_queue(&mut self, message: JobQueueMessage) {
        match message.status {
            JobStatus::Completed => println!("\r  {}                    ", message.text),
            _ => {
                print!(
                    "\r  {} {:.1}% ({:.0}s)  ",
                    message.text,
                    message.progress * 100.0,
                    message.elapsed
                );
                let _ = std::io::stdout().flush();
            }
        }
    }
}

/// Last frame of a clip of `length` frames starting at `clip_in`.
fn last_frame(clip_in: i64, length: u64) -> i64 {
    let length = i64::try_from(length).unwrap_or(i64::MAX);
    clip_in.saturating_add(length).saturating_sub(1).max(clip_in)
}

pub async fn run(config: &AppConfig, path: PathBuf, request: RenderRequest) -> anyhow::Result<()> {
    let data = load_clip(&path)?;
    config.ensure_dirs()?;
    let profile = profile_for(&data);
    let mut actions = ContainerActions::new(data, config, profile);

    if request.frames {
        let mut render_data = actions.effective_render_data();
        render_data.do_video_render = false;
        actions.set_render_data(render_data);
    }

    let clip_out = request.clip_out.unwrap_or_else(|| {
        actions
            .container_data()
            .unrendered_length
            .map_or(request.clip_in, |l| last_frame(request.clip_in, l))
    });
    let mut sequence = Sequence::with_tracks(1);
    let clip_id = sequence.append_clip(
        0,
        Clip {
            id: ClipId(0),
            name: actions.container_data().unrendered_media_name(),
            path: actions.container_data().unrendered_media.clone(),
            clip_in: request.clip_in,
            clip_out,
            filters: vec![],
            container_data: Some(actions.container_data().clone()),
        },
    );
    let clip = sequence
        .clip(clip_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Clip vanished from the sequence"))?;

    let mut jobs = ConsoleJobQueue;
    println!("Rendering {} ({})", path.display(), actions.program_id());
    match request.kind.as_str() {
        "full" => actions.render_full_media(&clip, &mut jobs)?,
        "clip" => actions.render_clip_length_media(&clip, &mut jobs)?,
        "preview" => actions.render_preview(Some(&clip), request.frame, request.clip_in, &mut jobs)?,
        other => anyhow::bail!("Unknown render kind: {other}. Use: full, clip, preview"),
    }
    actions.start_render(&mut jobs)?;
    tracing::debug!(
        poll_interval_ms = config.render.poll_interval_ms,
        session = %actions.session_dir().display(),
        "Polling render session"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.render.poll_interval_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut aborting = false;

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c, if !aborting => {
                aborting = true;
                println!("\n  Aborting render...");
                actions.abort_render(&mut jobs)?;
            }
        }

        match actions.update_render_status(&mut jobs, &mut sequence)? {
            PollOutcome::Waiting | PollOutcome::Progress(_) => {}
            PollOutcome::Aborted if actions.has_live_process() => {}
            other => break other,
        }
    };

    match outcome {
        PollOutcome::Completed(RenderCompletion::Replaced { resource, .. }) => {
            println!("Render complete: {}", resource.display());
        }
        PollOutcome::Completed(RenderCompletion::Preview { dir }) => {
            println!("Preview frames in: {}", dir.display());
        }
        PollOutcome::Completed(other) => {
            println!("Render complete: {other:?}");
        }
        PollOutcome::Failed(reason) => {
            println!("Render failed: {reason}");
        }
        PollOutcome::Aborted => println!("Render aborted."),
        PollOutcome::Idle | PollOutcome::Waiting | PollOutcome::Progress(_) => {}
    }

    actions
        .container_data()
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to save clip: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_frame_spans_length() {
        assert_eq!(last_frame(10, 50), 59);
    }

    #[test]
    fn test_last_frame_never_precedes_clip_in() {
        assert_eq!(last_frame(10, 0), 10);
        assert_eq!(last_frame(i64::MAX - 1, u64::MAX), i64::MAX - 1);
    }
}
