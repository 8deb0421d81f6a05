use once_cell::sync::Lazy;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn spawn_async<F>(fut: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    RUNTIME.spawn(fut);
}

#[cfg(feature = "gui")]
#[allow(deprecated)]
pub fn glib_channel<T: Send + 'static>() -> (glib::Sender<T>, glib::Receiver<T>) {
    glib::MainContext::channel(glib::Priority::default())
}

/// Runs `fut` on the tokio runtime and hands its output back on the GTK main loop.
#[cfg(feature = "gui")]
#[allow(deprecated)]
pub fn run_async_to_main<T, Fut>(fut: Fut) -> glib::Receiver<T>
where
    T: Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
{
    let (tx, rx) = glib_channel::<T>();
    spawn_async(async move {
        let res = fut.await;
        let _ = tx.send(res);
    });
    rx
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// `http(s)://host/...` to the Engine.IO websocket endpoint on the same origin.
pub fn socket_url(host: &str) -> Result<url::Url, url::ParseError> {
    let mut url = url::Url::parse(&normalize_url(host))?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // http/https -> ws/wss is always an allowed scheme swap
    let _ = url.set_scheme(scheme);
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_https() {
        assert_eq!(normalize_url(" example.org "), "https://example.org");
        assert_eq!(normalize_url("http://localhost:5000"), "http://localhost:5000");
    }

    #[test]
    fn socket_url_keeps_origin() {
        let url = socket_url("http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5000/socket.io/?EIO=4&transport=websocket");
        let url = socket_url("https://chat.example.org/app").unwrap();
        assert_eq!(url.as_str(), "wss://chat.example.org/socket.io/?EIO=4&transport=websocket");
    }
}
