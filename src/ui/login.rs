use crate::api::client::ApiClient;
use crate::app::AppConfig;
use crate::auth::{self, LoginForm};
use crate::session::{self, Route, SessionStore};
use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

pub fn show_login_window(app: &Application, config: &AppConfig, session: &SessionStore) {
    // Someone already logged in never sees the form.
    let route = session::guard_auth_page(session, Route::Login);
    if route != Route::Login {
        crate::ui::navigate(app, config, session, route);
        return;
    }

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("ChatSphere Login")
        .default_width(420)
        .default_height(320)
        .resizable(false)
        .build();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Connect with your world"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let username_entry = gtk::Entry::new();
    username_entry.set_placeholder_text(Some("Enter your username"));
    username_entry.set_hexpand(true);

    let pass_entry = gtk::PasswordEntry::new();
    pass_entry.set_placeholder_text(Some("Enter your password"));
    pass_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&username_entry);
    form.append(&pass_entry);
    root.append(&form);

    let login_btn = gtk::Button::with_label("Login");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    let signup_btn = gtk::Button::with_label("Don't have an account? Sign up");
    signup_btn.add_css_class("flat");
    signup_btn.set_halign(gtk::Align::Start);
    root.append(&signup_btn);

    let overlay = crate::ui::page_frame(&window, "ChatSphere", &root);

    let on_login = {
        let app = app.clone();
        let window = window.clone();
        let config = config.clone();
        let session = session.clone();
        let login_btn = login_btn.clone();
        let username_entry = username_entry.clone();
        let pass_entry = pass_entry.clone();
        move || {
            let form = LoginForm {
                username: username_entry.text().to_string(),
                password: pass_entry.text().to_string(),
            };
            if let Err(e) = form.validate() {
                crate::ui::toast(&overlay, &e.user_message());
                return;
            }

            login_btn.set_sensitive(false);
            login_btn.set_label("Logging in…");

            let client = ApiClient::new(&config);
            let session_for_async = session.clone();
            let rx = crate::utils::run_async_to_main(async move {
                auth::login(&client, &session_for_async, &form).await
            });

            let app = app.clone();
            let window = window.clone();
            let config = config.clone();
            let session = session.clone();
            let overlay = overlay.clone();
            let login_btn = login_btn.clone();
            rx.attach(None, move |res| {
                login_btn.set_sensitive(true);
                login_btn.set_label("Login");
                match res {
                    Ok(_) => {
                        crate::ui::navigate(&app, &config, &session, session::route(&session));
                        window.close();
                    }
                    Err(err) => {
                        log::warn!("login failed: {err}");
                        crate::ui::toast(&overlay, &err.user_message());
                    }
                }
                glib::ControlFlow::Continue
            });
        }
    };

    let on_login: Rc<dyn Fn()> = Rc::new(on_login);
    {
        let on_login = on_login.clone();
        login_btn.connect_clicked(move |_| (on_login)());
    }
    {
        let on_login = on_login.clone();
        username_entry.connect_activate(move |_| (on_login)());
    }
    {
        let on_login = on_login.clone();
        pass_entry.connect_activate(move |_| (on_login)());
    }
    {
        let app = app.clone();
        let window = window.clone();
        let config = config.clone();
        let session = session.clone();
        signup_btn.connect_clicked(move |_| {
            crate::ui::register::show_register_window(&app, &config, &session);
            window.close();
        });
    }

    window.present();
}
