use label_marker::prelude::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Diagnostics emitted by the overlay, captured through the `log` facade
#[cfg(test)]
mod icon_diagnostics_test {
    use super::*;

    struct CaptureLogger {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if let Ok(mut records) = self.records.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: Lazy<CaptureLogger> = Lazy::new(|| CaptureLogger {
        records: Mutex::new(Vec::new()),
    });

    static INIT: Lazy<()> = Lazy::new(|| {
        log::set_logger(&*LOGGER).expect("logger installed once");
        log::set_max_level(LevelFilter::Trace);
    });

    fn errors_mentioning(needle: &str) -> usize {
        LOGGER
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, message)| *level == Level::Error && message.contains(needle))
            .count()
    }

    #[test]
    fn test_non_string_icon_logs_error() {
        println!("🧪 [TEST] set_icon rejects non-string urls");
        Lazy::force(&INIT);

        let overlay = LabeledMarkerOverlay::new(
            HeadlessHost::new(),
            LabeledMarkerOptions::new((0.0, 0.0)),
        );

        overlay.set_icon(123, IconOptions::default());

        assert!(overlay.marker().content().is_none());
        assert!(errors_mentioning("icon url must be a string") >= 1);
        assert!(errors_mentioning("123") >= 1);
    }

    #[test]
    fn test_string_icon_logs_no_error() {
        Lazy::force(&INIT);

        let overlay = LabeledMarkerOverlay::new(
            HeadlessHost::new(),
            LabeledMarkerOptions::new((0.0, 0.0)),
        );

        overlay.set_icon("depot.svg", IconOptions::sized(24.0, 24.0));

        let image = overlay.marker().content().expect("icon set");
        assert_eq!(image.attribute("src").as_deref(), Some("depot.svg"));
        assert_eq!(errors_mentioning("depot.svg"), 0);
    }

    #[test]
    fn test_label_lifecycle_is_traced() {
        Lazy::force(&INIT);

        let map = HeadlessMap::new(LatLng::new(0.0, 0.0), 4.0, Point::new(400.0, 400.0));
        let overlay = LabeledMarkerOverlay::new(
            HeadlessHost::new(),
            LabeledMarkerOptions::new((0.0, 0.0)).with_map(map.clone()),
        );
        map.render_frame();
        overlay.set_map(None);

        let records = LOGGER.records.lock().unwrap();
        assert!(records
            .iter()
            .any(|(level, message)| *level == Level::Debug && message == "Label attached"));
        assert!(records
            .iter()
            .any(|(level, message)| *level == Level::Debug && message == "Label detached"));
    }
}
