use ratatui::Frame;

use crate::{ui::gallery::render_gallery, ui::surface_for, App, AppState};

/// A UI Screen boundary: responsible for rendering the current app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Collage screen - sizes the search surface, then draws the App widget
pub struct PlayScreen;

impl Screen for PlayScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        app.set_surface(surface_for(f.area()));
        f.render_widget(&*app, f.area());
    }
}

/// Gallery picker
pub struct GalleryScreen;

impl Screen for GalleryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_gallery(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Playing => Box::new(PlayScreen),
        AppState::Gallery => Box::new(GalleryScreen),
    }
}
