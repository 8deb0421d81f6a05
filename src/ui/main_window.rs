use crate::api::ChatBackend;
use crate::api::client::ApiClient;
use crate::api::events::InboundMessage;
use crate::api::models::User;
use crate::api::socket::{ChannelSlot, SocketChannel};
use crate::app::AppConfig;
use crate::chat::{ChatSession, InboundOutcome};
use crate::contacts::ContactDirectory;
use crate::session::{Route, SessionStore};
use crate::ui::chat_view::ChatView;
use crate::ui::sidebar::Sidebar;
use adw::Application;
use adw::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// State of the chat page. The page owns the real-time channel slot; the
/// view-model only ever sees it through `MessageChannel`.
struct ChatPage {
    user: User,
    store: SessionStore,
    backend: Arc<dyn ChatBackend>,
    channel: Arc<ChannelSlot>,
    session: RefCell<ChatSession>,
    directory: RefCell<ContactDirectory>,
    sidebar: Sidebar,
    chat: Rc<ChatView>,
    stack: gtk4::Stack,
    overlay: adw::ToastOverlay,
}

impl ChatPage {
    fn refresh_messages(&self) {
        let mut session = self.session.borrow_mut();
        let scroll = session.take_scroll_request();
        self.chat.render(session.messages(), scroll);
    }

    fn refresh_sidebar(&self) {
        self.sidebar.set_items(&self.directory.borrow());
    }

    fn select_contact(self: &Rc<Self>, index: usize) {
        let Some(contact) = self.directory.borrow_mut().select(index).cloned() else {
            return;
        };
        self.chat.set_contact(&contact);
        self.stack.set_visible_child_name("chat");

        let ticket = match self.session.borrow_mut().begin_open(contact) {
            Ok(ticket) => ticket,
            Err(e) => {
                crate::ui::toast(&self.overlay, &e.user_message());
                return;
            }
        };
        self.refresh_messages();
        self.refresh_sidebar();

        let fetch = self.session.borrow().fetch_history(&ticket);
        let rx = crate::utils::run_async_to_main(fetch);
        let page = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(history) => {
                    if page.session.borrow_mut().finish_open(&ticket, history) {
                        page.refresh_messages();
                    }
                }
                Err(err) => {
                    log::error!("history fetch for {} failed: {err}", ticket.to);
                    if page.session.borrow().is_current(&ticket) {
                        crate::ui::toast(&page.overlay, "Failed to load messages");
                    }
                }
            }
            glib::ControlFlow::Continue
        });
    }

    fn send(self: &Rc<Self>, text: String) {
        let Some(pending) = self.session.borrow_mut().send(&text) else {
            return;
        };
        if let Some(contact) = self.session.borrow().contact() {
            self.directory.borrow_mut().note_message(&contact.id, &text);
        }
        self.refresh_messages();
        self.refresh_sidebar();

        let ticket = pending.ticket;
        let rx = crate::utils::run_async_to_main(pending.persist);
        let page = self.clone();
        rx.attach(None, move |res| {
            if page.session.borrow_mut().confirm(ticket, &res) {
                page.refresh_messages();
            }
            glib::ControlFlow::Continue
        });
    }

    fn on_inbound(&self, msg: InboundMessage) {
        let text = msg.text.clone();
        let open_contact = self.session.borrow().contact().map(|c| c.id.clone());
        let outcome = self.session.borrow_mut().on_inbound(msg);
        match outcome {
            InboundOutcome::Appended => {
                if let Some(id) = open_contact {
                    self.directory.borrow_mut().note_message(&id, &text);
                }
                self.refresh_messages();
            }
            InboundOutcome::Routed(from) => {
                let mut directory = self.directory.borrow_mut();
                directory.note_unread(&from);
                directory.note_message(&from, &text);
            }
            InboundOutcome::Dropped => log::debug!("inbound message with no open conversation"),
        }
        self.refresh_sidebar();
    }

    fn load_contacts(self: &Rc<Self>) {
        match self.store.storage().cached_contacts(&self.user.id) {
            Ok(cached) if !cached.is_empty() => {
                self.directory.borrow_mut().set_contacts(cached);
                self.refresh_sidebar();
            }
            Ok(_) => {}
            Err(e) => log::warn!("contacts cache unavailable: {e}"),
        }

        let backend = Arc::clone(&self.backend);
        let storage = self.store.storage().clone();
        let user_id = self.user.id.clone();
        let rx = crate::utils::run_async_to_main(async move {
            let contacts = backend.contacts(&user_id).await?;
            if let Err(e) = storage.replace_contacts(&user_id, &contacts) {
                log::warn!("could not cache contacts: {e}");
            }
            Ok::<_, crate::Error>(contacts)
        });
        let page = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(contacts) => {
                    let selected = page.directory.borrow().selected().map(|c| c.id.clone());
                    let mut directory = page.directory.borrow_mut();
                    directory.set_contacts(contacts);
                    if let Some(idx) = selected.and_then(|id| directory.contacts().iter().position(|c| c.id == id)) {
                        directory.select(idx);
                    }
                    drop(directory);
                    page.refresh_sidebar();
                }
                Err(err) => crate::ui::toast(&page.overlay, &format!("Failed to load contacts: {}", err)),
            }
            glib::ControlFlow::Continue
        });
    }

    fn connect_channel(self: &Rc<Self>, host: String) {
        let user_id = self.user.id.clone();
        let rx = crate::utils::run_async_to_main(async move { SocketChannel::connect(&host, &user_id).await });
        let page = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok((channel, mut inbound)) => {
                    page.channel.set(channel);
                    let (tx, events) = crate::utils::glib_channel::<Option<InboundMessage>>();
                    crate::utils::spawn_async(async move {
                        while let Some(msg) = inbound.recv().await {
                            if tx.send(Some(msg)).is_err() {
                                return;
                            }
                        }
                        let _ = tx.send(None);
                    });
                    let page = page.clone();
                    events.attach(None, move |event| match event {
                        Some(msg) => {
                            page.on_inbound(msg);
                            glib::ControlFlow::Continue
                        }
                        None => {
                            if !page.channel.is_connected() {
                                page.shutdown_channel();
                            }
                            crate::ui::toast(&page.overlay, "Real-time connection lost");
                            glib::ControlFlow::Break
                        }
                    });
                }
                Err(err) => {
                    log::error!("real-time connect failed: {err}");
                    crate::ui::toast(&page.overlay, "Real-time connection failed");
                }
            }
            glib::ControlFlow::Continue
        });
    }

    fn shutdown_channel(&self) {
        if let Some(channel) = self.channel.take() {
            crate::utils::spawn_async(channel.disconnect());
        }
    }
}

pub fn show_main_window(app: &Application, config: &AppConfig, store: &SessionStore) {
    let user = match store.load() {
        Ok(Some(user)) => user,
        Ok(None) => return crate::ui::navigate(app, config, store, Route::Login),
        Err(e) => {
            log::error!("cannot read session: {e}");
            return crate::ui::navigate(app, config, store, Route::Login);
        }
    };
    if !user.is_avatar_image_set {
        return crate::ui::navigate(app, config, store, Route::SetAvatar);
    }

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("ChatSphere")
        .default_width(960)
        .default_height(640)
        .build();

    let overlay = adw::ToastOverlay::new();
    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .build();

    let sidebar = Sidebar::new();
    sidebar.set_profile(&user);
    split.set_flap(Some(&sidebar.widget()));

    let welcome = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    welcome.set_valign(gtk4::Align::Center);
    let greeting = gtk4::Label::new(Some(&format!("Welcome, {}!", user.username)));
    greeting.add_css_class("title-1");
    let hint = gtk4::Label::new(Some("Select a contact to start chatting."));
    hint.add_css_class("dim-label");
    welcome.append(&greeting);
    welcome.append(&hint);

    let chat = ChatView::new();
    let stack = gtk4::Stack::new();
    stack.add_named(&welcome, Some("welcome"));
    stack.add_named(&chat.widget(), Some("chat"));
    stack.set_visible_child_name("welcome");
    split.set_content(Some(&stack));
    overlay.set_child(Some(&split));

    let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk4::Label::new(Some("ChatSphere"));
    header.set_title_widget(Some(&title));
    let logout_btn = gtk4::Button::from_icon_name("system-shutdown-symbolic");
    logout_btn.set_tooltip_text(Some("Logout"));
    header.pack_end(&logout_btn);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let backend: Arc<dyn ChatBackend> = Arc::new(ApiClient::new(config));
    let channel = Arc::new(ChannelSlot::new());
    let session = ChatSession::new(user.clone(), Arc::clone(&backend), channel.clone());

    let page = Rc::new(ChatPage {
        user,
        store: store.clone(),
        backend,
        channel,
        session: RefCell::new(session),
        directory: RefCell::new(ContactDirectory::new()),
        sidebar,
        chat,
        stack,
        overlay,
    });

    {
        let page_for_select = page.clone();
        page.sidebar.connect_selected(move |idx| page_for_select.select_contact(idx));
    }
    {
        let page_for_send = page.clone();
        page.chat.connect_send(move |text| page_for_send.send(text));
    }
    {
        let page = page.clone();
        let app = app.clone();
        let config = config.clone();
        let window_for_logout = window.clone();
        logout_btn.connect_clicked(move |btn| {
            btn.set_sensitive(false);
            page.shutdown_channel();
            let backend = Arc::clone(&page.backend);
            let store = page.store.clone();
            let rx = crate::utils::run_async_to_main(async move { crate::auth::logout(&*backend, &store).await });
            let app = app.clone();
            let config = config.clone();
            let store = page.store.clone();
            let window = window_for_logout.clone();
            rx.attach(None, move |res| {
                if let Err(e) = res {
                    log::error!("logout cleanup failed: {e}");
                }
                crate::ui::navigate(&app, &config, &store, Route::Login);
                window.close();
                glib::ControlFlow::Continue
            });
        });
    }
    {
        let page = page.clone();
        window.connect_close_request(move |_| {
            page.shutdown_channel();
            gtk4::glib::Propagation::Proceed
        });
    }

    window.present();
    page.load_contacts();
    page.connect_channel(config.host.clone());
}
