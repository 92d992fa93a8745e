//! Per-clip render orchestration.
//!
//! [`ContainerActions`] owns the [`ContainerData`] of one container clip and
//! drives its renders through
//! `Idle → Queued → Rendering → {Completed | Aborted | Failed}`:
//!
//! 1. `render_*` picks the frame range and admits a job to the [`JobQueue`].
//! 2. The queue calls [`ContainerActions::start_render`] when the job may run.
//! 3. A timer calls [`ContainerActions::update_render_status`]; each tick reads
//!    the session store and pushes progress to the queue.
//! 4. On completion the placeholder clip is swapped for the rendered media
//!    through the [`TimelineEditGateway`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use montage_common::clock::{GracePeriod, ProgressWatch, RenderClock};
use montage_common::config::AppConfig;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{
    Clip, ClipId, ContainerData, ContainerEdit, ContainerEditKind, ContainerType, ProgramId,
    ProjectProfile, RenderData, RenderKind, TimelineEditGateway, TimelineError,
    CONTAINER_CLIP_VIDEO_CLIP_NAME, GENERATOR_EDIT_DATA_SLOT,
};
use montage_session_store::{RawStatus, RenderSessionStore, PREVIEW_DIR, RENDERED_FRAMES_DIR};

use crate::adapter::{
    adapter_for, LaunchContext, PreviewRenderer, PreviewRequest, ProgramAdapter,
    ProgressContext, RenderRange, SubprocessPreviewRenderer, ValidationEnv, ValidationError,
};
use crate::jobs::{JobQueue, JobQueueMessage, JobStatus};
use crate::launcher::{ProcessState, RenderLauncher, RenderProcess, SubprocessLauncher};
use crate::media::{copy_tree, frame_sequence_resource};
use crate::thumbnail::{write_thumbnail, Thumbnail};

/// Render lifecycle of one container clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Queued,
    Rendering,
    Completed,
    Aborted,
    Failed,
}

impl RenderState {
    /// Whether a render is admitted or running.
    pub fn is_active(self) -> bool {
        matches!(self, RenderState::Queued | RenderState::Rendering)
    }
}

/// What happens with the media once a render completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTarget {
    /// Swap the placeholder clip on the timeline.
    Timeline,
    /// Return the rendered resource to the caller, e.g. to add a generator
    /// to the media bin as a rendered clip.
    MediaItem,
}

/// A render in progress.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub render_kind: RenderKind,
    /// Range in timeline convention, before adapter normalization.
    pub range: RenderRange,
    /// The clip the render was requested for.
    pub clip: Option<Clip>,
    pub target: CompletionTarget,
    pub status: JobStatus,
    pub progress: f64,
}

/// How a completed render was delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCompletion {
    /// The timeline clip was replaced.
    Replaced { clip_id: ClipId, resource: PathBuf },
    /// The originating clip is gone from the timeline; nothing was edited.
    Dropped,
    /// Rendered media for a media item.
    MediaItem {
        resource: PathBuf,
        container_data: ContainerData,
    },
    /// Preview frames are ready.
    Preview { dir: PathBuf },
}

/// Result of one poll tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing is rendering.
    Idle,
    /// Rendering, but the renderer has not reported yet.
    Waiting,
    Progress(f64),
    Completed(RenderCompletion),
    Failed(String),
    Aborted,
}

/// Render orchestrator of one container clip.
pub struct ContainerActions {
    container_data: ContainerData,
    adapter: Box<dyn ProgramAdapter>,
    store: RenderSessionStore,
    config: AppConfig,
    profile: ProjectProfile,
    launcher: Box<dyn RenderLauncher>,
    preview_renderer: Box<dyn PreviewRenderer>,
    do_filters_clone: bool,
    state: RenderState,
    job: Option<RenderJob>,
    process: Option<RenderProcess>,
    clock: Option<RenderClock>,
    watch: ProgressWatch<RawStatus>,
    abort_grace: Option<GracePeriod>,
}

impl std::fmt::Debug for ContainerActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerActions")
            .field("container_type", &self.container_data.container_type)
            .field("program_id", &self.program_id())
            .field("state", &self.state)
            .field("job", &self.job)
            .finish_non_exhaustive()
    }
}

fn timeline_error(err: TimelineError) -> MontageError {
    MontageError::timeline(err.to_string())
}

impl ContainerActions {
    pub fn new(container_data: ContainerData, config: &AppConfig, profile: ProjectProfile) -> Self {
        Self {
            adapter: adapter_for(container_data.container_type),
            store: RenderSessionStore::new(&config.container_clips_dir),
            preview_renderer: Box::new(SubprocessPreviewRenderer::new(
                config.renderers.script_generator.clone(),
            )),
            launcher: Box::new(SubprocessLauncher),
            config: config.clone(),
            profile,
            container_data,
            do_filters_clone: true,
            state: RenderState::Idle,
            job: None,
            process: None,
            clock: None,
            watch: ProgressWatch::new(),
            abort_grace: None,
        }
    }

    /// Orchestrator for a timeline container clip.
    pub fn for_container(
        clip: &Clip,
        config: &AppConfig,
        profile: ProjectProfile,
    ) -> MontageResult<Self> {
        let data = clip.container_data.clone().ok_or_else(|| {
            MontageError::project(format!("Clip '{}' is not a container clip", clip.name))
        })?;
        Ok(Self::new(data, config, profile))
    }

    pub fn with_launcher(mut self, launcher: Box<dyn RenderLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_preview_renderer(mut self, renderer: Box<dyn PreviewRenderer>) -> Self {
        self.preview_renderer = renderer;
        self
    }

    pub fn container_data(&self) -> &ContainerData {
        &self.container_data
    }

    pub fn container_data_mut(&mut self) -> &mut ContainerData {
        &mut self.container_data
    }

    pub fn into_container_data(self) -> ContainerData {
        self.container_data
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn job(&self) -> Option<&RenderJob> {
        self.job.as_ref()
    }

    pub fn store(&self) -> &RenderSessionStore {
        &self.store
    }

    pub fn program_id(&self) -> ProgramId {
        self.container_data.program_id()
    }

    pub fn session_dir(&self) -> PathBuf {
        self.store.session_dir(&self.program_id())
    }

    /// Where rendered frames are written.
    pub fn rendered_media_dir(&self) -> PathBuf {
        self.output_root().join(RENDERED_FRAMES_DIR)
    }

    /// Where preview frames are written.
    pub fn preview_media_dir(&self) -> PathBuf {
        self.output_root().join(PREVIEW_DIR)
    }

    /// Rendered video file for video output renders.
    pub fn rendered_video_clip_path(&self) -> PathBuf {
        let render_data = self.effective_render_data();
        if render_data.save_internally {
            self.session_dir().join(format!(
                "{CONTAINER_CLIP_VIDEO_CLIP_NAME}{}",
                render_data.file_extension()
            ))
        } else {
            render_data.render_dir.join(format!(
                "{}{}",
                render_data.file_name,
                render_data.file_extension()
            ))
        }
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.config
            .thumbnail_dir
            .join(format!("{}.png", self.program_id()))
    }

    pub fn create_data_dirs_if_needed(&self) -> MontageResult<()> {
        self.store.create_session_dirs(&self.program_id())?;
        Ok(())
    }

    /// Replace the clip's encoding configuration.
    pub fn set_render_data(&mut self, render_data: RenderData) {
        self.container_data.render_data = Some(render_data);
    }

    /// The clip's encoding configuration, or the adapter default.
    pub fn effective_render_data(&self) -> RenderData {
        self.container_data
            .render_data
            .clone()
            .unwrap_or_else(|| self.adapter.default_render_data(&self.profile))
    }

    /// Playable resource of the last render: the video file, or an image
    /// sequence handle for frame output.
    pub fn rendered_resource_path(&self) -> MontageResult<Option<PathBuf>> {
        if self.effective_render_data().do_video_render {
            Ok(Some(self.rendered_video_clip_path()))
        } else {
            frame_sequence_resource(&self.rendered_media_dir())
        }
    }

    /// Check the user program. A failure moves the clip to `Failed`.
    pub fn validate_program(&mut self) -> Result<(), ValidationError> {
        let env = ValidationEnv {
            cache_dir: &self.config.cache_dir,
            resources_dir: &self.config.resources_dir,
            filter_interpreter: &self.config.renderers.filter_interpreter,
            default_generator_length: self.config.render.default_generator_length,
            profile: &self.profile,
            preview_renderer: self.preview_renderer.as_ref(),
        };
        match self.adapter.validate(&mut self.container_data, &env) {
            Ok(()) => {
                tracing::info!(program = %self.container_data.program.display(), "Program validated");
                Ok(())
            }
            Err(err) => {
                tracing::info!(
                    program = %self.container_data.program.display(),
                    detail = %err.detail,
                    "Program validation failed"
                );
                self.state = RenderState::Failed;
                Err(err)
            }
        }
    }

    /// Queue a render of the whole program output.
    pub fn render_full_media(&mut self, clip: &Clip, jobs: &mut dyn JobQueue) -> MontageResult<()> {
        let range = RenderRange::full(self.unrendered_length()?);
        self.enqueue(RenderKind::Full, range, Some(clip.clone()), CompletionTarget::Timeline, jobs)
    }

    /// Queue a render of the program output under `clip` only.
    pub fn render_clip_length_media(
        &mut self,
        clip: &Clip,
        jobs: &mut dyn JobQueue,
    ) -> MontageResult<()> {
        let range = RenderRange::clip_length(clip)?;
        self.enqueue(
            RenderKind::ClipLength,
            range,
            Some(clip.clone()),
            CompletionTarget::Timeline,
            jobs,
        )
    }

    /// Queue a single frame render. Previews never edit the timeline.
    pub fn render_preview(
        &mut self,
        clip: Option<&Clip>,
        frame: i64,
        frame_start_offset: i64,
        jobs: &mut dyn JobQueue,
    ) -> MontageResult<()> {
        let range = RenderRange::single_frame(frame, frame_start_offset);
        self.enqueue(
            RenderKind::SinglePreview,
            range,
            clip.cloned(),
            CompletionTarget::Timeline,
            jobs,
        )
    }

    /// Queue a full render whose result goes back to the caller instead of
    /// the timeline.
    pub fn render_media_item(&mut self, jobs: &mut dyn JobQueue) -> MontageResult<()> {
        let range = RenderRange::full(self.unrendered_length()?);
        self.enqueue(RenderKind::Full, range, None, CompletionTarget::MediaItem, jobs)
    }

    fn unrendered_length(&self) -> MontageResult<u64> {
        match self.container_data.unrendered_length {
            Some(length) => Ok(length),
            None if self.container_data.container_type == ContainerType::ScriptGenerator => {
                Ok(self.config.render.default_generator_length)
            }
            None => Err(MontageError::render(
                "Container clip has no unrendered length, full render is not possible",
            )),
        }
    }

    fn enqueue(
        &mut self,
        render_kind: RenderKind,
        range: RenderRange,
        clip: Option<Clip>,
        target: CompletionTarget,
        jobs: &mut dyn JobQueue,
    ) -> MontageResult<()> {
        if self.state.is_active() {
            return Err(MontageError::render(format!(
                "A render is already {:?} for program {}",
                self.state,
                self.program_id()
            )));
        }
        // An aborted renderer keeps its session dir until it exits or its
        // grace period ends in a kill.
        self.supervise_shutdown();
        if self.has_live_process() {
            let remaining = self.abort_grace.map_or(Duration::ZERO, |g| g.remaining());
            return Err(MontageError::render(format!(
                "Previous renderer for program {} is still shutting down ({}s left)",
                self.program_id(),
                remaining.as_secs()
            )));
        }
        self.process = None;

        self.job = Some(RenderJob {
            render_kind,
            range,
            clip,
            target,
            status: JobStatus::Queued,
            progress: 0.0,
        });
        self.state = RenderState::Queued;
        self.abort_grace = None;

        let text = format!("In Queue - {}", self.adapter.job_name(&self.container_data));
        jobs.add_job(self.message(JobStatus::Queued, 0.0, text, 0.0));
        tracing::info!(
            program_id = %self.program_id(),
            kind = ?render_kind,
            range_in = range.range_in,
            range_out = range.range_out,
            "Render queued"
        );
        Ok(())
    }

    /// Launch the queued render. Called by the job queue.
    pub fn start_render(&mut self, jobs: &mut dyn JobQueue) -> MontageResult<()> {
        let Some(job) = self.job.as_ref().filter(|_| self.state == RenderState::Queued) else {
            return Err(MontageError::render("No queued render to start"));
        };
        let range = self.adapter.normalize_range(job.range);
        let id = self.program_id();

        self.create_data_dirs_if_needed()?;
        self.store.clear_flags(&id)?;

        if self.container_data.render_data.is_none() {
            self.container_data.render_data = Some(self.adapter.default_render_data(&self.profile));
        }
        let render_data = self.effective_render_data();
        self.store.set_render_data(&id, &render_data)?;
        self.adapter
            .prepare_session(&self.store, &id, &self.container_data)?;

        jobs.update_job_queue(self.message(
            JobStatus::Rendering,
            0.0,
            "Render Starting...".to_string(),
            0.0,
        ));

        let args = self.adapter.build_launch_args(&LaunchContext {
            program_id: &id,
            parent_folder: self.store.parent_folder(),
            container_data: &self.container_data,
            range,
            generator_length: self
                .container_data
                .unrendered_length
                .unwrap_or(self.config.render.default_generator_length),
            profile: &self.profile,
        });
        let command = self.adapter.renderer_command(&self.config.renderers);

        let process = match self
            .launcher
            .launch(command, &args, self.adapter.launch_mode())
        {
            Ok(process) => process,
            Err(err) => {
                self.finish_failed(jobs, err.to_string());
                return Err(err);
            }
        };

        let clock = RenderClock::start();
        tracing::info!(program_id = %id, started_at = clock.epoch_wall(), "Render started");
        self.process = Some(process);
        self.clock = Some(clock);
        self.watch = ProgressWatch::new();
        self.state = RenderState::Rendering;
        if let Some(job) = self.job.as_mut() {
            job.status = JobStatus::Rendering;
        }
        Ok(())
    }

    /// One poll tick.
    pub fn update_render_status(
        &mut self,
        jobs: &mut dyn JobQueue,
        timeline: &mut dyn TimelineEditGateway,
    ) -> MontageResult<PollOutcome> {
        self.supervise_shutdown();
        match self.state {
            RenderState::Rendering => self.poll_rendering(jobs, timeline),
            RenderState::Aborted => Ok(PollOutcome::Aborted),
            _ => Ok(PollOutcome::Idle),
        }
    }

    fn poll_rendering(
        &mut self,
        jobs: &mut dyn JobQueue,
        timeline: &mut dyn TimelineEditGateway,
    ) -> MontageResult<PollOutcome> {
        let id = self.program_id();
        let process_state = self
            .process
            .as_mut()
            .map_or(ProcessState::Unknown, RenderProcess::poll_exit);

        if self.store.is_complete(&id) {
            return self.complete(jobs, timeline);
        }

        if let Some(error) = self.store.error(&id) {
            return Ok(self.finish_failed(jobs, error.trim().to_string()));
        }

        match process_state {
            ProcessState::Exited(status) => {
                return Ok(self.finish_failed(
                    jobs,
                    format!("Renderer exited with {status} before completing"),
                ));
            }
            ProcessState::LaunchFailed(reason) => {
                return Ok(self.finish_failed(jobs, format!("Renderer launch failed: {reason}")));
            }
            ProcessState::Running | ProcessState::Unknown => {}
        }

        let outcome = match self.store.get_status(&id) {
            Some(raw) => {
                self.watch.observe(raw.clone());
                PollOutcome::Progress(self.report_progress(&raw, jobs))
            }
            None => {
                tracing::trace!(program_id = %id, "No render status yet");
                PollOutcome::Waiting
            }
        };

        if let Some(timeout) = self.config.render.stall_timeout_secs {
            if self.watch.is_stalled(Duration::from_secs(timeout)) {
                tracing::warn!(program_id = %id, timeout_secs = timeout, "Render stalled");
                if let Err(e) = self.store.abort(&id) {
                    tracing::warn!(program_id = %id, error = %e, "Failed to write abort marker");
                }
                self.abort_grace = Some(self.grace_period());
                return Ok(self.finish_failed(
                    jobs,
                    format!("Render stalled: no status change for {timeout}s"),
                ));
            }
        }

        Ok(outcome)
    }

    fn report_progress(&mut self, raw: &RawStatus, jobs: &mut dyn JobQueue) -> f64 {
        let Some(job) = self.job.as_ref() else {
            return 0.0;
        };
        let render_data = self.effective_render_data();
        let job_name = self.adapter.job_name(&self.container_data);
        let clip_name = job
            .clip
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| self.container_data.program_name());

        let normalized = self.adapter.interpret_status(
            raw,
            &ProgressContext {
                render_kind: job.render_kind,
                range: self.adapter.normalize_range(job.range),
                render_data: &render_data,
                job_name: &job_name,
                clip_name: &clip_name,
            },
        );

        tracing::debug!(
            program_id = %self.program_id(),
            step = ?raw.step(),
            progress = normalized.progress,
            "Render progress"
        );
        jobs.update_job_queue(self.message(
            JobStatus::Rendering,
            normalized.progress,
            normalized.text,
            normalized.elapsed,
        ));
        self.container_data.progress = Some(normalized.progress);
        if let Some(job) = self.job.as_mut() {
            job.progress = normalized.progress;
        }
        normalized.progress
    }

    fn complete(
        &mut self,
        jobs: &mut dyn JobQueue,
        timeline: &mut dyn TimelineEditGateway,
    ) -> MontageResult<PollOutcome> {
        let Some(job) = self.job.clone() else {
            return Err(MontageError::render("Render completed without a job"));
        };

        if job.render_kind == RenderKind::SinglePreview {
            self.mark_completed(jobs);
            return Ok(PollOutcome::Completed(RenderCompletion::Preview {
                dir: self.preview_media_dir(),
            }));
        }

        // A clip deleted mid-render takes its output with it.
        if job.target == CompletionTarget::Timeline {
            let on_timeline = job
                .clip
                .as_ref()
                .and_then(|clip| timeline.track_and_index_for_id(clip.id))
                .is_some();
            if !on_timeline {
                tracing::debug!(
                    program_id = %self.program_id(),
                    "Clip left the timeline, render completion dropped"
                );
                self.mark_completed(jobs);
                return Ok(PollOutcome::Completed(RenderCompletion::Dropped));
            }
        }

        let resource = match self.rendered_resource_path() {
            Ok(Some(resource)) => resource,
            Ok(None) => {
                let reason = format!(
                    "No rendered frames found in {}",
                    self.rendered_media_dir().display()
                );
                return Ok(self.finish_failed(jobs, reason));
            }
            Err(err) => return Ok(self.finish_failed(jobs, err.to_string())),
        };

        let completion = match job.target {
            CompletionTarget::MediaItem => {
                self.record_render(&job, &resource);
                RenderCompletion::MediaItem {
                    resource,
                    container_data: self.container_data.clone(),
                }
            }
            CompletionTarget::Timeline => {
                match self.create_producer_and_do_update_edit(timeline, resource) {
                    Ok(completion) => completion,
                    Err(err) => return Ok(self.finish_failed(jobs, err.to_string())),
                }
            }
        };
        self.mark_completed(jobs);
        Ok(PollOutcome::Completed(completion))
    }

    fn mark_completed(&mut self, jobs: &mut dyn JobQueue) {
        let job_name = self.adapter.job_name(&self.container_data);
        jobs.update_job_queue(self.message(
            JobStatus::Completed,
            1.0,
            format!("Render Complete - {job_name}"),
            self.clock.as_ref().map_or(0.0, RenderClock::elapsed_secs),
        ));

        self.state = RenderState::Completed;
        self.container_data.progress = None;
        self.process = None;
        if let Some(job) = self.job.as_mut() {
            job.status = JobStatus::Completed;
            job.progress = 1.0;
            tracing::info!(program_id = %self.container_data.program_id(), kind = ?job.render_kind, "Render complete");
        }
    }

    fn record_render(&mut self, job: &RenderJob, resource: &Path) {
        self.container_data.rendered_media = Some(resource.to_path_buf());
        self.container_data.rendered_media_range_in = Some(job.range.range_in);
        self.container_data.rendered_media_range_out = Some(job.range.range_out);
        self.container_data.last_render_type = Some(job.render_kind);
    }

    /// Replace the clip the current job was started for with `resource`.
    ///
    /// The clip's position is looked up at call time. A clip that has left
    /// the timeline yields [`RenderCompletion::Dropped`].
    pub fn create_producer_and_do_update_edit(
        &mut self,
        timeline: &mut dyn TimelineEditGateway,
        resource: PathBuf,
    ) -> MontageResult<RenderCompletion> {
        let job = self
            .job
            .clone()
            .ok_or_else(|| MontageError::render("No render job to complete"))?;
        let old_clip = job
            .clip
            .clone()
            .ok_or_else(|| MontageError::render("Render job has no timeline clip"))?;

        let Some((track, index)) = timeline.track_and_index_for_id(old_clip.id) else {
            tracing::debug!(
                program_id = %self.program_id(),
                clip_id = old_clip.id.0,
                "Clip left the timeline, render completion dropped"
            );
            return Ok(RenderCompletion::Dropped);
        };

        let validate = !self.effective_render_data().do_video_render;
        let mut new_clip = timeline
            .create_file_producer_clip(&resource, Some(&old_clip.name), validate)
            .map_err(timeline_error)?;

        let kind = match job.render_kind {
            RenderKind::Full => ContainerEditKind::FullRenderReplace,
            _ => ContainerEditKind::ClipRenderReplace,
        };
        self.record_render(&job, &resource);
        new_clip.container_data = Some(self.container_data.clone());
        let clip_id = new_clip.id;

        timeline
            .apply_edit(ContainerEdit {
                kind,
                old_clip,
                new_clip,
                rendered_media_path: Some(resource.clone()),
                track,
                index,
                do_filters_clone: self.do_filters_clone,
            })
            .map_err(timeline_error)?;

        tracing::info!(
            program_id = %self.program_id(),
            track,
            index,
            edit = ?kind,
            "Replaced clip with rendered media"
        );
        Ok(RenderCompletion::Replaced { clip_id, resource })
    }

    /// Put the placeholder media back in place of `rendered_clip`.
    ///
    /// Returns the id of the placeholder clip, or `None` when the rendered
    /// clip is not on the timeline.
    pub fn switch_to_unrendered_media(
        &mut self,
        rendered_clip: &Clip,
        timeline: &mut dyn TimelineEditGateway,
    ) -> MontageResult<Option<ClipId>> {
        let Some((track, index)) = timeline.track_and_index_for_id(rendered_clip.id) else {
            return Ok(None);
        };
        let mut unrendered = timeline
            .create_file_producer_clip(&self.container_data.unrendered_media, None, false)
            .map_err(timeline_error)?;

        let mut data = self.container_data.clone();
        data.last_render_type = None;
        data.progress = None;
        unrendered.container_data = Some(data);
        let clip_id = unrendered.id;

        timeline
            .apply_edit(ContainerEdit {
                kind: ContainerEditKind::SwitchToUnrendered,
                old_clip: rendered_clip.clone(),
                new_clip: unrendered,
                rendered_media_path: None,
                track,
                index,
                do_filters_clone: self.do_filters_clone,
            })
            .map_err(timeline_error)?;
        self.container_data.last_render_type = None;

        tracing::info!(program_id = %self.program_id(), track, index, "Switched to unrendered media");
        Ok(Some(clip_id))
    }

    /// Cancel the current render.
    ///
    /// A running renderer is asked to stop through the session store; if it
    /// is still alive after the configured grace period the next poll tick
    /// kills it.
    pub fn abort_render(&mut self, jobs: &mut dyn JobQueue) -> MontageResult<()> {
        match self.state {
            RenderState::Queued => {
                tracing::info!(program_id = %self.program_id(), "Queued render cancelled");
            }
            RenderState::Rendering => {
                self.store.abort(&self.program_id())?;
                self.abort_grace = Some(self.grace_period());
            }
            _ => return Ok(()),
        }

        let progress = self.job.as_ref().map_or(0.0, |j| j.progress);
        let text = format!("Render Aborted - {}", self.adapter.job_name(&self.container_data));
        jobs.update_job_queue(self.message(JobStatus::Completed, progress, text, 0.0));
        self.state = RenderState::Aborted;
        self.container_data.progress = None;
        Ok(())
    }

    /// Whether a renderer process is still alive or still being launched.
    pub fn has_live_process(&mut self) -> bool {
        self.process
            .as_mut()
            .is_some_and(|p| p.poll_exit() == ProcessState::Running)
    }

    fn grace_period(&self) -> GracePeriod {
        GracePeriod::start(Duration::from_secs(self.config.render.abort_grace_secs))
    }

    /// Kill a renderer that outlived its abort grace period.
    fn supervise_shutdown(&mut self) {
        let Some(grace) = self.abort_grace else {
            return;
        };
        let Some(process) = self.process.as_mut() else {
            self.abort_grace = None;
            return;
        };
        match process.poll_exit() {
            ProcessState::Running if grace.expired() => {
                tracing::warn!(
                    program_id = %self.container_data.program_id(),
                    pid = ?process.id(),
                    "Renderer ignored abort request, killing it"
                );
                if let Err(e) = process.kill() {
                    tracing::warn!(error = %e, "Failed to kill renderer");
                }
                self.process = None;
                self.abort_grace = None;
            }
            ProcessState::Running => {}
            _ => {
                self.process = None;
                self.abort_grace = None;
            }
        }
    }

    fn finish_failed(&mut self, jobs: &mut dyn JobQueue, reason: String) -> PollOutcome {
        tracing::warn!(program_id = %self.program_id(), reason = %reason, "Render failed");
        let progress = self.job.as_ref().map_or(0.0, |j| j.progress);
        jobs.update_job_queue(self.message(
            JobStatus::Completed,
            progress,
            format!("Render Failed - {reason}"),
            self.clock.as_ref().map_or(0.0, RenderClock::elapsed_secs),
        ));
        self.state = RenderState::Failed;
        self.container_data.progress = None;
        if self.abort_grace.is_none() {
            self.process = None;
        }
        PollOutcome::Failed(reason)
    }

    fn message(&self, status: JobStatus, progress: f64, text: String, elapsed: f64) -> JobQueueMessage {
        JobQueueMessage {
            uid: self.program_id().to_string(),
            job_type: self.adapter.job_type(),
            status,
            progress,
            text,
            elapsed,
        }
    }

    /// Duplicate a container clip without re-rendering it.
    ///
    /// The copy gets a new uid, so a new program id and session. Rendered
    /// media is copied into the new session.
    pub fn clone_clip(
        &self,
        old_clip: &Clip,
        timeline: &mut dyn TimelineEditGateway,
    ) -> MontageResult<Clip> {
        let old_data = old_clip.container_data.clone().ok_or_else(|| {
            MontageError::project(format!("Clip '{}' is not a container clip", old_clip.name))
        })?;
        let old_actions = ContainerActions::new(old_data.clone(), &self.config, self.profile.clone());

        let mut new_data = old_data.clone();
        new_data.generate_clip_id();
        new_data.progress = None;
        let mut new_actions = ContainerActions::new(new_data, &self.config, self.profile.clone());
        new_actions.create_data_dirs_if_needed()?;

        let mut clone = match (&old_data.rendered_media, &old_data.render_data) {
            (Some(_), Some(render_data)) if render_data.do_video_render => {
                let source = old_actions.rendered_video_clip_path();
                let mut render_data = render_data.clone();
                render_data.save_internally = true;
                new_actions.set_render_data(render_data);
                let target = new_actions.rendered_video_clip_path();
                std::fs::copy(&source, &target)?;
                new_actions.container_data.rendered_media = Some(target.clone());
                timeline
                    .create_file_producer_clip(&target, None, false)
                    .map_err(timeline_error)?
            }
            (Some(_), Some(render_data)) => {
                let source = old_actions.rendered_media_dir();
                let mut render_data = render_data.clone();
                render_data.save_internally = true;
                new_actions.set_render_data(render_data);
                let copied = copy_tree(&source, &new_actions.rendered_media_dir())?;
                tracing::debug!(frames = copied, "Copied rendered frames for clone");
                let resource = new_actions.rendered_resource_path()?.ok_or_else(|| {
                    MontageError::render(format!("No rendered frames found in {}", source.display()))
                })?;
                new_actions.container_data.rendered_media = Some(resource.clone());
                timeline
                    .create_file_producer_clip(&resource, None, false)
                    .map_err(timeline_error)?
            }
            _ => timeline
                .create_file_producer_clip(&old_clip.path, None, false)
                .map_err(timeline_error)?,
        };

        clone.name = old_clip.name.clone();
        clone.clip_in = old_clip.clip_in;
        clone.clip_out = old_clip.clip_out;
        clone.filters = old_clip.filters.clone();
        tracing::info!(
            from = %old_data.program_id(),
            to = %new_actions.program_id(),
            "Cloned container clip"
        );
        clone.container_data = Some(new_actions.into_container_data());
        Ok(clone)
    }

    /// Write the clip thumbnail.
    ///
    /// Uses the icon override slot when set, otherwise the placeholder
    /// media. Generators report their declared length.
    pub fn create_icon(&self) -> MontageResult<Thumbnail> {
        let source = self
            .container_data
            .data_slots
            .icon_file()
            .unwrap_or_else(|| self.container_data.unrendered_media.clone());
        let mut thumbnail = write_thumbnail(&source, &self.thumbnail_path())?;

        if let Some(length) = self
            .container_data
            .data_slots
            .generator_edit_data()
            .and_then(|d| d.get("length"))
            .and_then(serde_json::Value::as_u64)
        {
            thumbnail.length = Some(length);
        }
        Ok(thumbnail)
    }

    /// Store edited generator parameter values.
    pub fn apply_editors(&mut self, editors: serde_json::Value) -> MontageResult<()> {
        self.require_generator()?;
        let edit_data = self
            .container_data
            .data_slots
            .generator_edit_data_mut()
            .and_then(serde_json::Value::as_object_mut)
            .ok_or_else(|| {
                MontageError::validation(format!(
                    "Generator has no {GENERATOR_EDIT_DATA_SLOT}; validate it first"
                ))
            })?;
        edit_data.insert("editors_list".to_string(), editors);
        Ok(())
    }

    /// Render one generator frame into the preview dir.
    ///
    /// Returns the written frame file, or the preview dir when the script
    /// engine does not name the file.
    pub fn render_generator_preview(
        &mut self,
        editors: Option<&serde_json::Value>,
        frame: i64,
    ) -> MontageResult<PathBuf> {
        self.require_generator()?;
        self.create_data_dirs_if_needed()?;
        if self.container_data.render_data.is_none() {
            self.container_data.render_data = Some(self.adapter.default_render_data(&self.profile));
        }
        let out_dir = self.preview_media_dir();
        std::fs::create_dir_all(&out_dir)?;

        let context = self.preview_renderer.render_preview(&PreviewRequest {
            script: &self.container_data.program,
            frame,
            length: self
                .container_data
                .unrendered_length
                .unwrap_or(self.config.render.default_generator_length),
            profile: &self.profile,
            output_dir: Some(&out_dir),
            editors,
        })?;
        if let Some(error) = context.error {
            return Err(MontageError::render(error));
        }
        Ok(context.frame_file.unwrap_or(out_dir))
    }

    fn require_generator(&self) -> MontageResult<()> {
        if self.container_data.container_type != ContainerType::ScriptGenerator {
            return Err(MontageError::unsupported(format!(
                "{} clips have no generator parameters",
                self.container_data.container_type
            )));
        }
        Ok(())
    }

    fn output_root(&self) -> PathBuf {
        match &self.container_data.render_data {
            Some(render_data) if !render_data.save_internally => render_data.render_dir.clone(),
            _ => self.session_dir(),
        }
    }
}
