//! eframe front end: input -> events, shell snapshots -> panels.
//!
//! Holds no playback state of its own beyond view toggles (help, library,
//! filter tab). Everything else is read from the shell each frame.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use log::{debug, info, warn};

use crate::config::PlayerSettings;
use crate::core::engine::MediaEngine;
use crate::core::event_bus::EventEmitter;
use crate::core::library_events::*;
use crate::core::player_events::*;
use crate::entities::media::{ALL_EXTS, AUDIO_EXTS, KindFilter, MediaKind, VIDEO_EXTS, collect_picked};
use crate::help;
use crate::shell::Shell;
use crate::utils::{format_size, format_time};

/// Repaint period while a video is playing
const VIDEO_REPAINT: Duration = Duration::from_millis(15);

/// Create configured file dialog for media selection
fn create_media_dialog(title: &str) -> rfd::FileDialog {
    rfd::FileDialog::new()
        .add_filter("All Supported Files", ALL_EXTS)
        .add_filter("Video", VIDEO_EXTS)
        .add_filter("Audio", AUDIO_EXTS)
        .set_title(title)
}

/// Emit events for files picked by the dialog or dropped on the window.
///
/// With nothing loaded the first file is opened and the rest are added;
/// otherwise everything is only added.
fn emit_picked(emitter: &EventEmitter, paths: &[PathBuf], has_media: bool) {
    let mut files = collect_picked(paths);
    if files.is_empty() {
        return;
    }
    if !has_media {
        let first = files.remove(0);
        emitter.emit(OpenFileEvent(first));
    }
    if !files.is_empty() {
        emitter.emit(AddFilesEvent(files));
    }
}

/// Current picture on the GPU, tagged with the adapter epoch that decoded it
struct VideoTexture {
    epoch: u64,
    texture: egui::TextureHandle,
}

pub struct TapedeckApp<E: MediaEngine> {
    shell: Shell<E>,
    video: Option<VideoTexture>,
    /// Settings as they are on disk (CLI overrides are not persisted)
    persisted: PlayerSettings,
    settings_path: PathBuf,
    status_interval: Duration,
    filter: KindFilter,
    show_help: bool,
    show_library: bool,
}

impl<E: MediaEngine> TapedeckApp<E> {
    pub fn new(
        shell: Shell<E>,
        persisted: PlayerSettings,
        status_interval_ms: u64,
        settings_path: PathBuf,
    ) -> Self {
        let show_library = persisted.show_library;
        Self {
            shell,
            video: None,
            persisted,
            settings_path,
            status_interval: Duration::from_millis(status_interval_ms.max(10)),
            filter: KindFilter::All,
            show_help: false,
            show_library,
        }
    }

    /// Borderless fullscreen on, window with decorations off
    fn set_fullscreen(&self, ctx: &egui::Context, enabled: bool) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(enabled));
        ctx.send_viewport_cmd(egui::ViewportCommand::Decorations(!enabled));
        ctx.request_repaint();
    }

    fn show_open_dialog(&self) {
        if let Some(paths) = create_media_dialog("Open Media").pick_files() {
            info!("Picked {} file(s)", paths.len());
            emit_picked(&self.shell.emitter(), &paths, self.shell.session.has_media());
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let emitter = self.shell.emitter();
        let has_media = self.shell.session.has_media();
        let error_shown = self.shell.error_msg.is_some();
        let is_fullscreen = self.shell.is_fullscreen();

        let mut toggle_help = false;
        let mut toggle_library = false;
        let mut dropped: Vec<PathBuf> = Vec::new();

        ctx.input(|i| {
            if i.pointer.is_moving() || i.pointer.any_pressed() {
                emitter.emit(PointerActivityEvent);
            }

            if i.key_pressed(egui::Key::Space) || i.key_pressed(egui::Key::K) {
                emitter.emit(TogglePlayPauseEvent);
            }
            if i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::J) {
                emitter.emit(SeekBackwardEvent);
            }
            if i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::L) {
                emitter.emit(SeekForwardEvent);
            }
            if i.key_pressed(egui::Key::S) {
                emitter.emit(CycleSpeedEvent);
            }
            if i.key_pressed(egui::Key::F) || i.key_pressed(egui::Key::Z) {
                emitter.emit(ToggleFullscreenEvent);
            }
            if i.key_pressed(egui::Key::O) {
                emitter.emit(ShowOpenDialogEvent);
            }
            if i.key_pressed(egui::Key::Escape) {
                if is_fullscreen {
                    emitter.emit(ExitFullscreenEvent);
                } else if error_shown {
                    emitter.emit(DismissErrorEvent);
                }
            }
            toggle_help = i.key_pressed(egui::Key::F1);
            toggle_library = i.key_pressed(egui::Key::F2);

            for file in &i.raw.dropped_files {
                if let Some(path) = &file.path {
                    dropped.push(path.clone());
                }
            }
        });

        if toggle_help {
            self.show_help = !self.show_help;
        }
        if toggle_library {
            self.show_library = !self.show_library;
        }
        if !dropped.is_empty() {
            info!("Files dropped: {:?}", dropped);
            emit_picked(&emitter, &dropped, has_media);
        }
    }

    fn render_error(&self, ctx: &egui::Context) {
        let Some(msg) = &self.shell.error_msg else {
            return;
        };
        let emitter = self.shell.emitter();
        egui::TopBottomPanel::top("error").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::from_rgb(255, 110, 110), msg.as_str());
                if ui.small_button("Dismiss").clicked() {
                    emitter.emit(DismissErrorEvent);
                }
            });
        });
    }

    fn render_library(&mut self, ctx: &egui::Context) {
        let emitter = self.shell.emitter();
        let catalog = &self.shell.catalog;
        let now_playing = self.shell.now_playing();
        let filter = &mut self.filter;

        egui::SidePanel::left("library")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Library");
                ui.horizontal(|ui| {
                    ui.selectable_value(filter, KindFilter::All, format!("All ({})", catalog.len()));
                    for kind in [MediaKind::Video, MediaKind::Audio] {
                        ui.selectable_value(
                            filter,
                            KindFilter::Only(kind),
                            format!("{} ({})", kind.label(), catalog.count_by_kind(kind)),
                        );
                    }
                });
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for entry in catalog.filter(*filter) {
                        ui.horizontal(|ui| {
                            if ui.small_button("✕").on_hover_text("Remove").clicked() {
                                emitter.emit(RemoveEntryEvent(entry.id));
                            }
                            let selected = now_playing == Some(entry.id);
                            if ui
                                .selectable_label(selected, entry.name.as_str())
                                .on_hover_text(format!("{} · {}", entry.uri, format_size(entry.size_bytes)))
                                .double_clicked()
                            {
                                emitter.emit(PlayEntryEvent(entry.id));
                            }
                        });
                    }
                });

                ui.separator();
                ui.label(format!(
                    "{} item(s), {}",
                    catalog.len(),
                    format_size(catalog.total_size_bytes())
                ));
                if ui.button("Add files…").clicked() {
                    emitter.emit(ShowOpenDialogEvent);
                }
            });
    }

    fn render_transport(&self, ctx: &egui::Context) {
        let emitter = self.shell.emitter();
        let session = &self.shell.session;
        let status = *session.status();
        let playing = session.effective_is_playing();

        egui::TopBottomPanel::bottom("transport").show(ctx, |ui| {
            ui.add_space(4.0);

            // Progress bar, click to seek
            let width = ui.available_width();
            let (rect, response) =
                ui.allocate_exact_size(egui::vec2(width, 8.0), egui::Sense::click());
            let painter = ui.painter();
            painter.rect_filled(rect, 2.0, egui::Color32::from_gray(60));
            let mut filled = rect;
            filled.set_width(rect.width() * session.progress() as f32);
            painter.rect_filled(filled, 2.0, egui::Color32::from_rgb(255, 200, 100));

            if response.clicked()
                && let (Some(pos), Some(duration)) = (response.interact_pointer_pos(), status.duration_ms)
            {
                let ratio = ((pos.x - rect.left()) / rect.width().max(1.0)).clamp(0.0, 1.0) as f64;
                let target = (duration as f64 * ratio) as i64;
                emitter.emit(SeekByEvent(target - status.position_ms as i64));
            }

            ui.horizontal(|ui| {
                let total = status
                    .duration_ms
                    .map(format_time)
                    .unwrap_or_else(|| "--:--".to_string());
                ui.monospace(format!("{} / {}", format_time(status.position_ms), total));

                ui.separator();
                if ui.button("⏪").on_hover_text("Seek back").clicked() {
                    emitter.emit(SeekBackwardEvent);
                }
                let label = if playing { "⏸" } else { "▶" };
                // Dimmed until the engine confirms the request
                let mut text = egui::RichText::new(label);
                if session.has_pending_toggle() {
                    text = text.weak();
                }
                if ui.button(text).on_hover_text("Play/Pause").clicked() {
                    emitter.emit(TogglePlayPauseEvent);
                }
                if ui.button("⏩").on_hover_text("Seek forward").clicked() {
                    emitter.emit(SeekForwardEvent);
                }
                if ui.button(session.speed_label()).on_hover_text("Cycle speed").clicked() {
                    emitter.emit(CycleSpeedEvent);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⛶").on_hover_text("Fullscreen").clicked() {
                        emitter.emit(ToggleFullscreenEvent);
                    }
                    if ui.button("Open").clicked() {
                        emitter.emit(ShowOpenDialogEvent);
                    }
                    ui.label(session.file_name());
                });
            });
            ui.add_space(4.0);
        });
    }

    fn render_center(&self, ctx: &egui::Context) {
        let session = &self.shell.session;
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(video) = &self.video {
                    // Letterbox: fit the picture, keep its aspect
                    let rect = ui.max_rect();
                    let size = video.texture.size_vec2();
                    let scale = (rect.width() / size.x).min(rect.height() / size.y);
                    let target = egui::Rect::from_center_size(rect.center(), size * scale);
                    ui.painter().image(
                        video.texture.id(),
                        target,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                } else {
                    ui.centered_and_justified(|ui| {
                        let text = if !session.has_media() {
                            "Drag'n'drop media here or press O to open\nF1 for help".to_string()
                        } else if !session.status().is_loaded {
                            format!("Opening {}…", session.file_name())
                        } else {
                            session.file_name().to_string()
                        };
                        ui.label(
                            egui::RichText::new(text)
                                .size(18.0)
                                .color(egui::Color32::from_gray(160)),
                        );
                    });
                }

                if self.show_help {
                    egui::Area::new(egui::Id::new("help_overlay"))
                        .anchor(egui::Align2::LEFT_TOP, egui::vec2(12.0, 12.0))
                        .show(ui.ctx(), help::render_help_overlay);
                }
            });
    }

    /// Upload the newest decoded picture. A different (or no) adapter drops the old one.
    fn sync_video(&mut self, ctx: &egui::Context) {
        let epoch = self.shell.session.current_epoch();
        if self.video.as_ref().is_some_and(|v| Some(v.epoch) != epoch) {
            self.video = None;
        }
        let Some(epoch) = epoch else {
            return;
        };
        let Some(frame) = self.shell.session.take_video_frame() else {
            return;
        };

        let image = egui::ColorImage::from_rgba_unmultiplied([frame.width, frame.height], &frame.rgba);
        match &mut self.video {
            Some(video) => video.texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                debug!("Video {}x{} (epoch {})", frame.width, frame.height, epoch);
                self.video = Some(VideoTexture {
                    epoch,
                    texture: ctx.load_texture("video", image, egui::TextureOptions::LINEAR),
                });
            }
        }
    }

    /// Sleep until whichever comes first: the next hide or the next repaint period
    fn schedule_repaint(&self, ctx: &egui::Context, now: Instant) {
        let mut wait = self.shell.next_wakeup(now);
        if self.shell.session.has_media() {
            let period = if self.video.is_some() && self.shell.session.effective_is_playing() {
                VIDEO_REPAINT
            } else {
                self.status_interval
            };
            wait = Some(wait.map_or(period, |w| w.min(period)));
        }
        if let Some(wait) = wait {
            ctx.request_repaint_after(wait);
        }
    }
}

impl<E: MediaEngine> eframe::App for TapedeckApp<E> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.handle_input(ctx);

        let result = self.shell.handle_events(now);
        if let Some(enabled) = result.fullscreen_changed {
            self.set_fullscreen(ctx, enabled);
        }
        if result.show_open_dialog {
            self.show_open_dialog();
            ctx.request_repaint();
        }

        if self.shell.update(now) {
            ctx.request_repaint();
        }

        self.sync_video(ctx);

        self.render_error(ctx);
        if self.show_library && !self.shell.is_fullscreen() {
            self.render_library(ctx);
        }
        if self.shell.controls.is_visible() {
            self.render_transport(ctx);
        }
        self.render_center(ctx);

        self.schedule_repaint(ctx, now);
    }

    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        if self.persisted.show_library == self.show_library {
            return;
        }
        self.persisted.show_library = self.show_library;
        match self.persisted.save(&self.settings_path) {
            Ok(()) => debug!("Settings saved"),
            Err(e) => warn!("Failed to save settings: {:#}", e),
        }
    }
}
