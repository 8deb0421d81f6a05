pub mod avatar;
pub mod chat_view;
pub mod login;
pub mod main_window;
pub mod register;
pub mod sidebar;

use crate::app::AppConfig;
use crate::session::{Route, SessionStore};
use adw::Application;
use adw::prelude::*;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gtk4 as gtk;
use gtk4::gdk_pixbuf;
use gtk4::gdk_pixbuf::prelude::*;

pub fn navigate(app: &Application, config: &AppConfig, session: &SessionStore, route: Route) {
    log::debug!("navigating to {route:?}");
    match route {
        Route::Login => login::show_login_window(app, config, session),
        Route::Register => register::show_register_window(app, config, session),
        Route::SetAvatar => avatar::show_avatar_window(app, config, session),
        Route::Chat => main_window::show_main_window(app, config, session),
    }
}

pub(crate) fn toast(overlay: &adw::ToastOverlay, msg: &str) {
    overlay.add_toast(adw::Toast::new(msg));
}

/// Decodes a base64 SVG avatar; falls back to the stock avatar icon.
pub(crate) fn avatar_image(encoded: &str, size: i32) -> gtk::Image {
    let image = STANDARD
        .decode(encoded.as_bytes())
        .ok()
        .and_then(|bytes| {
            let loader = gdk_pixbuf::PixbufLoader::new();
            loader.set_size(size, size);
            loader.write(&bytes).ok()?;
            loader.close().ok()?;
            loader.pixbuf()
        })
        .map(|pixbuf| {
            #[allow(deprecated)]
            gtk::Image::from_pixbuf(Some(&pixbuf))
        })
        .unwrap_or_else(|| gtk::Image::from_icon_name("avatar-default-symbolic"));
    image.set_pixel_size(size);
    image
}

/// Shared header + toast overlay frame every page uses.
pub(crate) fn page_frame(window: &adw::ApplicationWindow, title: &str, root: &gtk::Box) -> adw::ToastOverlay {
    let toast_overlay = adw::ToastOverlay::new();
    toast_overlay.set_child(Some(root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some(title));
    header.set_title_widget(Some(&title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));
    toast_overlay
}
