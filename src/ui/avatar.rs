use crate::api::client::ApiClient;
use crate::app::AppConfig;
use crate::avatar::AvatarPicker;
use crate::session::{self, Route, SessionStore};
use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

const AVATAR_SIZE: i32 = 96;

pub fn show_avatar_window(app: &Application, config: &AppConfig, session: &SessionStore) {
    if !session.is_logged_in() {
        crate::ui::navigate(app, config, session, Route::Login);
        return;
    }

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Choose Your Avatar")
        .default_width(560)
        .default_height(320)
        .build();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 16);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Choose Your Avatar"));
    title.add_css_class("title-2");
    root.append(&title);

    let grid = gtk::Box::new(gtk::Orientation::Horizontal, 12);
    grid.set_halign(gtk::Align::Center);
    root.append(&grid);

    let actions = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    actions.set_halign(gtk::Align::Center);
    let shuffle_btn = gtk::Button::with_label("Shuffle");
    let submit_btn = gtk::Button::with_label("Set Profile Picture");
    submit_btn.add_css_class("suggested-action");
    actions.append(&shuffle_btn);
    actions.append(&submit_btn);
    root.append(&actions);

    let overlay = crate::ui::page_frame(&window, "ChatSphere", &root);
    let picker = Rc::new(RefCell::new(AvatarPicker::new()));
    fill_grid(&grid, &picker);

    {
        let grid = grid.clone();
        let picker = picker.clone();
        shuffle_btn.connect_clicked(move |_| {
            picker.borrow_mut().generate();
            fill_grid(&grid, &picker);
        });
    }
    {
        let app = app.clone();
        let window = window.clone();
        let config = config.clone();
        let session = session.clone();
        submit_btn.connect_clicked(move |btn| {
            let picker = picker.borrow().clone();
            if picker.selected().is_none() {
                crate::ui::toast(&overlay, "Please select an avatar");
                return;
            }
            btn.set_sensitive(false);

            let client = ApiClient::new(&config);
            let session_for_async = session.clone();
            let rx = crate::utils::run_async_to_main(async move {
                picker.commit(&client, &session_for_async).await
            });

            let btn = btn.clone();
            let app = app.clone();
            let window = window.clone();
            let config = config.clone();
            let session = session.clone();
            let overlay = overlay.clone();
            rx.attach(None, move |res| {
                btn.set_sensitive(true);
                match res {
                    Ok(_) => {
                        crate::ui::navigate(&app, &config, &session, session::route(&session));
                        window.close();
                    }
                    Err(err) if err.is_validation() => crate::ui::toast(&overlay, &err.user_message()),
                    Err(err) => {
                        log::warn!("set avatar failed: {err}");
                        crate::ui::toast(&overlay, "Error setting avatar. Please try again.");
                    }
                }
                glib::ControlFlow::Continue
            });
        });
    }

    window.present();
}

fn fill_grid(grid: &gtk::Box, picker: &Rc<RefCell<AvatarPicker>>) {
    while let Some(child) = grid.first_child() {
        grid.remove(&child);
    }
    let mut group: Option<gtk::ToggleButton> = None;
    for (idx, encoded) in picker.borrow().candidates().iter().enumerate() {
        let button = gtk::ToggleButton::new();
        button.set_child(Some(&crate::ui::avatar_image(encoded, AVATAR_SIZE)));
        button.add_css_class("flat");
        if let Some(first) = &group {
            button.set_group(Some(first));
        } else {
            group = Some(button.clone());
        }
        let picker = picker.clone();
        button.connect_toggled(move |b| {
            if b.is_active() {
                if let Err(e) = picker.borrow_mut().select(idx) {
                    log::warn!("{e}");
                }
            }
        });
        grid.append(&button);
    }
}
