//! Integration tests for binding crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use httpmock::prelude::*;
    use imgbind_binding::*;
    use imgbind_errors::FetchError;
    use imgbind_events::{AppEvent, DownloadEvent, EventReceiver};
    use imgbind_net::{HttpReply, HttpTransport, SharedClient, TransportFailure};
    use imgbind_simulator::Simulator;
    use imgbind_types::{DynamicImage, HttpResponse, Image};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;
    use url::Url;

    #[derive(Default)]
    struct RecordingView {
        images: Mutex<Vec<Image>>,
    }

    impl RecordingView {
        fn count(&self) -> usize {
            self.images.lock().unwrap().len()
        }

        fn last(&self) -> Option<Image> {
            self.images.lock().unwrap().last().cloned()
        }
    }

    impl ImageView for RecordingView {
        fn set_image(&self, image: Image) {
            self.images.lock().unwrap().push(image);
        }
    }

    /// Transport serving one PNG, optionally held until released
    struct PngTransport {
        body: Bytes,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl PngTransport {
        fn new(gate: Option<Arc<Notify>>) -> Self {
            Self {
                body: Bytes::from(png_bytes(6, 5)),
                calls: AtomicUsize::new(0),
                gate,
            }
        }
    }

    #[async_trait]
    impl HttpTransport for PngTransport {
        async fn get(&self, url: &Url) -> Result<HttpReply, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(HttpReply {
                response: HttpResponse::new(url.as_str(), 200)
                    .with_header("content-type", "image/png"),
                body: self.body.clone(),
            })
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn image(width: u32, height: u32) -> Image {
        Image::from_dynamic(DynamicImage::new_rgb8(width, height))
    }

    fn drain(rx: &mut EventReceiver) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Download(event) = event {
                events.push(event);
            }
        }
        events
    }

    /// Log of callback invocations, in order
    type Log = Arc<Mutex<Vec<String>>>;

    fn record_callbacks(binding: &ImageBinding, log: &Log) {
        let l = Arc::clone(log);
        binding.on_success_async(move |image: Image| {
            l.lock().unwrap().push(format!("success_async {}", image.width()));
            Some(image)
        });
        let l = Arc::clone(log);
        binding.on_success(move |image: Image| {
            l.lock().unwrap().push(format!("success {}", image.width()));
            Some(image)
        });
        let l = Arc::clone(log);
        binding.on_error_async(move |error: &FetchError, response: Option<&HttpResponse>| {
            l.lock().unwrap().push(format!(
                "error_async {} {:?}",
                error.code(),
                response.map(|r| r.status)
            ));
        });
        let l = Arc::clone(log);
        binding.on_error(move |error: &FetchError, response: Option<&HttpResponse>| {
            l.lock().unwrap().push(format!(
                "error {} {:?}",
                error.code(),
                response.map(|r| r.status)
            ));
        });
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_transport() {
        let transport = Arc::new(PngTransport::new(None));
        let (queue, mut runner) = main_queue();
        let context = DownloadContext::new(transport.clone(), Arc::new(queue)).unwrap();
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let log: Log = Arc::default();
        record_callbacks(&binding, &log);

        binding.set_url("35px.jpg");

        // The async error callback ran before set_url returned
        assert_eq!(*log.lock().unwrap(), vec!["error_async -1 None"]);
        assert_eq!(runner.run_pending(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["error_async -1 None", "error -1 None"]
        );
        assert_eq!(binding.state(), SessionState::Failed);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.count(), 0);
    }

    #[tokio::test]
    async fn test_simulator_substring_match() {
        let simulator = Simulator::new();
        let registration = simulator.simulate("cat.png");
        let transport = Arc::new(PngTransport::new(None));
        let context = DownloadContext::new(transport.clone(), Arc::new(InlineDispatcher))
            .unwrap()
            .with_simulator(simulator.clone());
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);

        binding.set_url("http://x/cat.png?v=2");

        assert_eq!(registration.downloader_count(), 1);
        assert_eq!(registration.downloaders()[0].url(), "http://x/cat.png?v=2");
        assert!(binding.session().unwrap().is_simulated());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        // Nothing happens until the test responds
        assert_eq!(view.count(), 0);
        assert_eq!(binding.state(), SessionState::Downloading);
    }

    #[tokio::test]
    async fn test_autorespond_delivers_without_manual_respond() {
        let simulator = Simulator::new();
        let fixture = image(35, 35);
        simulator.autorespond_with_image("cat.png", fixture.clone());
        let (queue, mut runner) = main_queue();
        let context = DownloadContext::new(Arc::new(SharedClient::default()), Arc::new(queue))
            .unwrap()
            .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let log: Log = Arc::default();
        record_callbacks(&binding, &log);

        binding.set_url("http://x/cat.png");

        // Simulated results skip the UI queue
        assert_eq!(runner.run_pending(), 0);
        assert!(view.last().unwrap().ptr_eq(&fixture));
        assert_eq!(*log.lock().unwrap(), vec!["success_async 35", "success 35"]);
        assert_eq!(binding.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_autorespond_with_error() {
        let simulator = Simulator::new();
        simulator.autorespond_with_error(
            "broken",
            Some(FetchError::HttpStatusNotOk { status: 404 }),
            Some(HttpResponse::new("http://x/broken.png", 404)),
        );
        let context = DownloadContext::new(
            Arc::new(SharedClient::default()),
            Arc::new(InlineDispatcher),
        )
        .unwrap()
        .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let log: Log = Arc::default();
        record_callbacks(&binding, &log);

        binding.set_url("http://x/broken.png");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["error_async -2 Some(404)", "error -2 Some(404)"]
        );
        assert_eq!(view.count(), 0);
        assert_eq!(binding.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_cleared_simulator_uses_transport() {
        let simulator = Simulator::new();
        let registration = simulator.simulate("cat.png");
        simulator.clear();

        let transport = Arc::new(PngTransport::new(None));
        let (queue, mut runner) = main_queue();
        let context = DownloadContext::new(transport.clone(), Arc::new(queue))
            .unwrap()
            .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);

        binding.set_url("http://x/cat.png");
        assert!(!binding.session().unwrap().is_simulated());

        assert!(tokio::time::timeout(Duration::from_secs(5), runner.run_next())
            .await
            .unwrap());
        assert_eq!(registration.downloader_count(), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.last().unwrap().width(), 6);
    }

    #[tokio::test]
    async fn test_cancel_suppresses_all_callbacks() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(PngTransport::new(Some(gate.clone())));
        let (queue, mut runner) = main_queue();
        let (tx, mut rx) = imgbind_events::channel();
        let context = DownloadContext::new(transport.clone(), Arc::new(queue))
            .unwrap()
            .with_events(tx);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let log: Log = Arc::default();
        record_callbacks(&binding, &log);

        binding.set_url("http://x/slow.png");
        tokio::time::sleep(Duration::from_millis(20)).await;
        binding.cancel();
        binding.cancel();
        gate.notify_waiters();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(runner.run_pending(), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(view.count(), 0);
        assert_eq!(binding.state(), SessionState::Cancelled);
        assert_eq!(binding.url().as_deref(), Some("http://x/slow.png"));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DownloadEvent::Started { simulated: false, .. }));
        assert!(matches!(events[1], DownloadEvent::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_cancel_between_stages() {
        let transport = Arc::new(PngTransport::new(None));
        let (queue, mut runner) = main_queue();
        let context = DownloadContext::new(transport, Arc::new(queue)).unwrap();
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let log: Log = Arc::default();
        record_callbacks(&binding, &log);

        binding.set_url("http://x/a.png");

        // Wait for the async stage to hand its job to the UI queue
        for _ in 0..100 {
            if !log.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*log.lock().unwrap(), vec!["success_async 6"]);

        binding.cancel();
        assert_eq!(runner.run_pending(), 1);

        assert_eq!(*log.lock().unwrap(), vec!["success_async 6"]);
        assert_eq!(view.count(), 0);
    }

    #[tokio::test]
    async fn test_none_from_callbacks_keeps_view() {
        let simulator = Simulator::new();
        let registration = simulator.simulate("a.png");
        let context = DownloadContext::new(
            Arc::new(SharedClient::default()),
            Arc::new(InlineDispatcher),
        )
        .unwrap()
        .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);

        let ui_calls = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&ui_calls);
        binding.on_success_async(|_: Image| None);
        binding.on_success(move |image: Image| {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(image)
        });

        binding.set_url("http://x/a.png");
        registration.respond_with_image(&image(1, 1));
        assert_eq!(ui_calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.count(), 0);
        assert_eq!(binding.state(), SessionState::Completed);

        // The UI callback can veto too, and can replace the image
        binding.on_success_async(Some);
        binding.on_success(|_: Image| None);
        registration.respond_with_image(&image(1, 1));
        assert_eq!(view.count(), 0);

        let replacement = image(9, 9);
        let shown = replacement.clone();
        binding.on_success(move |_: Image| Some(shown.clone()));
        registration.respond_with_image(&image(1, 1));
        assert!(view.last().unwrap().ptr_eq(&replacement));
    }

    #[tokio::test]
    async fn test_dropped_view_is_ignored() {
        let simulator = Simulator::new();
        let registration = simulator.simulate("a.png");
        let context = DownloadContext::new(
            Arc::new(SharedClient::default()),
            Arc::new(InlineDispatcher),
        )
        .unwrap()
        .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        binding.on_success(move |image: Image| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(image)
        });

        binding.set_url("http://x/a.png");
        drop(view);
        registration.respond_with_image(&image(1, 1));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(binding.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_repeated_simulated_responses() {
        let simulator = Simulator::new();
        let registration = simulator.simulate("a.png");
        let context = DownloadContext::new(
            Arc::new(SharedClient::default()),
            Arc::new(InlineDispatcher),
        )
        .unwrap()
        .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);

        binding.set_url("http://x/a.png");
        registration.respond_with_image(&image(1, 1));
        registration.respond_with_image(&image(2, 2));

        assert_eq!(view.count(), 2);
        assert_eq!(view.last().unwrap().width(), 2);
    }

    #[tokio::test]
    async fn test_http_download_through_main_queue() {
        let server = MockServer::start_async().await;
        let body = png_bytes(35, 20);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/35px.png");
                then.status(200)
                    .header("content-type", "image/png")
                    .body(&body);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.png");
                then.status(404);
            })
            .await;

        let (queue, mut runner) = main_queue();
        let (tx, mut rx) = imgbind_events::channel();
        let context = DownloadContext::from_config(&imgbind_config::Config::default(), Arc::new(queue))
            .unwrap()
            .with_events(tx);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);
        let log: Log = Arc::default();
        record_callbacks(&binding, &log);

        binding.set_url(server.url("/35px.png"));
        assert!(tokio::time::timeout(Duration::from_secs(5), runner.run_next())
            .await
            .unwrap());
        assert_eq!(view.last().unwrap().width(), 35);
        assert_eq!(binding.state(), SessionState::Completed);

        binding.set_url(server.url("/missing.png"));
        assert!(tokio::time::timeout(Duration::from_secs(5), runner.run_next())
            .await
            .unwrap());
        assert_eq!(view.count(), 1);
        assert_eq!(binding.state(), SessionState::Failed);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "success_async 35",
                "success 35",
                "error_async -2 Some(404)",
                "error -2 Some(404)",
            ]
        );

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[1],
            DownloadEvent::Completed { width: 35, height: 20, displayed: true, .. }
        ));
        match &events[3] {
            DownloadEvent::Failed { status, failure, .. } => {
                assert_eq!(*status, Some(404));
                assert_eq!(failure.code.as_deref(), Some("fetch.http_status_not_ok"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_new_url_during_ui_stage_keeps_stale_image_off_view() {
        let simulator = Simulator::new();
        simulator.autorespond_with_image("new.png", image(35, 35));
        let context = DownloadContext::new(
            Arc::new(PngTransport::new(None)),
            Arc::new(InlineDispatcher),
        )
        .unwrap()
        .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = ImageBinding::new(context, &view);

        // Hold the old download inside on_success until the URL changed
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let (e, r) = (Arc::clone(&entered), Arc::clone(&release));
        binding.on_success(move |image: Image| {
            if image.width() == 6 {
                e.wait();
                r.wait();
            }
            Some(image)
        });

        binding.set_url("http://x/old.png");
        let old = binding.session().unwrap();
        entered.wait();

        binding.set_url("http://x/new.png");
        assert_eq!(view.last().unwrap().width(), 35);
        release.wait();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(view.count(), 1);
        assert_eq!(view.last().unwrap().width(), 35);
        assert_eq!(old.state(), SessionState::Cancelled);
        assert_eq!(binding.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_error_callback_can_assign_new_url() {
        let simulator = Simulator::new();
        simulator.autorespond_with_error(
            "broken",
            Some(FetchError::HttpStatusNotOk { status: 500 }),
            None,
        );
        simulator.autorespond_with_image("fallback.png", image(35, 35));
        let context = DownloadContext::new(
            Arc::new(SharedClient::default()),
            Arc::new(InlineDispatcher),
        )
        .unwrap()
        .with_simulator(simulator);
        let view = Arc::new(RecordingView::default());
        let binding = Arc::new(ImageBinding::new(context, &view));

        let weak = Arc::downgrade(&binding);
        binding.on_error(move |_: &FetchError, _: Option<&HttpResponse>| {
            if let Some(binding) = weak.upgrade() {
                binding.set_url("http://x/fallback.png");
            }
        });

        binding.set_url("http://x/broken.png");

        assert_eq!(binding.url().as_deref(), Some("http://x/fallback.png"));
        assert_eq!(view.last().unwrap().width(), 35);
        assert_eq!(binding.state(), SessionState::Completed);
    }
}
