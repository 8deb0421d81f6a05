use crate::api::client::ApiClient;
use crate::app::AppConfig;
use crate::auth::{self, RegisterForm};
use crate::session::{self, Route, SessionStore};
use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;

pub fn show_register_window(app: &Application, config: &AppConfig, session: &SessionStore) {
    let route = session::guard_auth_page(session, Route::Register);
    if route != Route::Register {
        crate::ui::navigate(app, config, session, route);
        return;
    }

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("ChatSphere Sign up")
        .default_width(420)
        .default_height(420)
        .resizable(false)
        .build();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let username_entry = gtk::Entry::new();
    username_entry.set_placeholder_text(Some("Enter your username"));
    let email_entry = gtk::Entry::new();
    email_entry.set_placeholder_text(Some("Enter your email"));
    email_entry.set_input_purpose(gtk::InputPurpose::Email);
    let pass_entry = gtk::PasswordEntry::new();
    pass_entry.set_placeholder_text(Some("Enter your password"));
    let confirm_entry = gtk::PasswordEntry::new();
    confirm_entry.set_placeholder_text(Some("Confirm your password"));

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&username_entry);
    form.append(&email_entry);
    form.append(&pass_entry);
    form.append(&confirm_entry);
    root.append(&form);

    let create_btn = gtk::Button::with_label("Create Account");
    create_btn.add_css_class("suggested-action");
    create_btn.set_halign(gtk::Align::End);
    root.append(&create_btn);

    let login_link = gtk::Button::with_label("Already have an account? Log in");
    login_link.add_css_class("flat");
    login_link.set_halign(gtk::Align::Start);
    root.append(&login_link);

    let overlay = crate::ui::page_frame(&window, "ChatSphere", &root);

    {
        let app = app.clone();
        let window = window.clone();
        let config = config.clone();
        let session = session.clone();
        create_btn.connect_clicked(move |btn| {
            let form = RegisterForm {
                username: username_entry.text().to_string(),
                email: email_entry.text().to_string(),
                password: pass_entry.text().to_string(),
                confirm_password: confirm_entry.text().to_string(),
            };
            if let Err(e) = form.validate() {
                crate::ui::toast(&overlay, &e.user_message());
                return;
            }
            btn.set_sensitive(false);
            btn.set_label("Creating Account…");

            let client = ApiClient::new(&config);
            let session_for_async = session.clone();
            let rx = crate::utils::run_async_to_main(async move {
                auth::register(&client, &session_for_async, &form).await
            });

            let btn = btn.clone();
            let app = app.clone();
            let window = window.clone();
            let config = config.clone();
            let session = session.clone();
            let overlay = overlay.clone();
            rx.attach(None, move |res| {
                btn.set_sensitive(true);
                btn.set_label("Create Account");
                match res {
                    Ok(user) => {
                        log::info!("account {} created", user.username);
                        crate::ui::navigate(&app, &config, &session, session::route(&session));
                        window.close();
                    }
                    Err(err) => crate::ui::toast(&overlay, &err.user_message()),
                }
                glib::ControlFlow::Continue
            });
        });
    }
    {
        let app = app.clone();
        let window = window.clone();
        let config = config.clone();
        let session = session.clone();
        login_link.connect_clicked(move |_| {
            crate::ui::login::show_login_window(&app, &config, &session);
            window.close();
        });
    }

    window.present();
}
