mod state;
mod ui;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use eframe::{egui, App, Frame, NativeOptions};
use egui::{FontData, FontDefinitions, FontFamily};
use minidesk_settings::{resolve_data_dir, PreferencesStore, ThemeChoice, PREFERENCES_FILE};
use minidesk_storage::{FileStore, MemoryStore, SharedStore};
use state::Desk;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const APP_TITLE: &str = "MiniDesk";

struct MiniDeskApp {
    desk: Desk,
}

impl MiniDeskApp {
    fn new(cc: &eframe::CreationContext<'_>, desk: Desk) -> Self {
        install_fonts(&cc.egui_ctx);
        cc.egui_ctx.set_visuals(match desk.theme {
            ThemeChoice::Dark => egui::Visuals::dark(),
            ThemeChoice::Light => egui::Visuals::light(),
        });
        Self { desk }
    }
}

impl App for MiniDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ui::draw(&mut self.desk, ctx);
        self.desk.tick(Instant::now());
        if self.desk.has_unsaved_changes() {
            ctx.request_repaint_after(self.desk.save_debounce());
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.desk.flush();
    }
}

/// Opens the data directory, falling back to an in-memory store when it cannot be
/// created. Returns a warning to show in that case.
fn open_store(data_dir: &std::path::Path) -> (SharedStore, Option<String>) {
    match fs::create_dir_all(data_dir) {
        Ok(()) => (Arc::new(FileStore::new(data_dir)), None),
        Err(error) => {
            warn!(path = %data_dir.display(), %error, "data directory unavailable; using memory");
            let message = format!(
                "Cannot use {} ({error}); changes will not be kept",
                data_dir.display()
            );
            (Arc::new(MemoryStore::new()), Some(message))
        }
    }
}

fn install_fonts(ctx: &egui::Context) {
    let Some((name, data)) = load_cjk_font() else {
        return;
    };
    let mut definitions = FontDefinitions::default();
    definitions
        .font_data
        .insert(name.clone(), FontData::from_owned(data));
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        if let Some(fonts) = definitions.families.get_mut(&family) {
            fonts.push(name.clone());
        }
    }
    ctx.set_fonts(definitions);
}

/// Notes may hold CJK text, which the bundled fonts do not cover.
fn load_cjk_font() -> Option<(String, Vec<u8>)> {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::from("assets/fonts/NotoSansTC-Regular.otf")];

    #[cfg(target_os = "windows")]
    {
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\msjh.ttc"));
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\mingliu.ttc"));
    }

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from("/System/Library/Fonts/PingFang.ttc"));
    }

    #[cfg(target_os = "linux")]
    {
        candidates.push(PathBuf::from(
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        ));
        candidates.push(PathBuf::from(
            "/usr/share/fonts/truetype/noto/NotoSansTC-Regular.ttf",
        ));
    }

    candidates
        .into_iter()
        .filter(|path| path.exists())
        .find_map(|path| fs::read(path).ok())
        .map(|bytes| ("cjk_fallback".to_string(), bytes))
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("minidesk=info")),
        )
        .init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let data_dir = resolve_data_dir(explicit.as_deref(), &cwd);
    info!(data_dir = %data_dir.display(), "starting");

    let preferences = PreferencesStore::load_or_default(data_dir.join(PREFERENCES_FILE));
    let (store, warning) = open_store(&data_dir);
    let today = chrono::Local::now().date_naive();
    let mut desk = Desk::new(store, preferences.preferences(), today);
    if let Some(warning) = warning {
        desk.notifications.error(warning);
    }
    desk.begin_hydration();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| Box::new(MiniDeskApp::new(cc, desk))),
    )
}
