use label_marker::prelude::*;

/// Drives a labeled marker through a headless map session and prints where
/// the label lands after each step
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    run()
}

fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Create map centered on San Francisco
    let center = LatLng::new(37.7749, -122.4194);
    let map = HeadlessMap::new(center, 12.0, Point::new(1200.0, 800.0));

    let options = LabeledMarkerOptions::from_json(serde_json::json!({
        "position": { "lat": 37.7955, "lng": -122.3937 },
        "title": "Ferry Building",
        "labelContent": "<b>Ferry Building</b>",
        "labelClass": "poi-label",
        "labelStyle": { "color": "#1a73e8", "fontSize": "13px" },
        "draggable": true
    }))?
    .with_map(map.clone());

    let overlay = LabeledMarkerOverlay::new(HeadlessHost::new(), options);
    for kind in EventKind::MARKER_EVENTS {
        overlay.add_listener(kind, move |event: Option<&HeadlessEvent>| {
            match event.and_then(|e| e.lat_lng) {
                Some(at) => println!("  {:<9} at ({:.4}, {:.4})", kind, at.lat, at.lng),
                None => println!("  {:<9} on label", kind),
            }
        });
    }

    map.render_frame();
    report("attached", &overlay);

    map.pan_by(Point::new(-150.0, 80.0));
    map.render_frame();
    report("panned", &overlay);

    map.set_zoom(14.0);
    map.render_frame();
    report("zoomed", &overlay);

    println!("dragging marker:");
    overlay.marker().simulate_drag(&[
        LatLng::new(37.7950, -122.3945),
        LatLng::new(37.7940, -122.3960),
        LatLng::new(37.7930, -122.3975),
    ]);
    map.render_frame();
    report("dragged", &overlay);

    println!("clicking label:");
    if let Some(label) = overlay.label_element() {
        label.click();
    }

    overlay.set_label_style([("color", "#d93025")]);
    overlay.set_icon("https://maps.gstatic.com/mapfiles/ms2/micons/red.png", IconOptions::sized(32.0, 32.0));

    overlay.set_map(None);
    println!(
        "removed from map: visible={}, label={:?}",
        overlay.is_visible(),
        overlay.label_element()
    );

    overlay.set_map(Some(&map));
    map.render_frame();
    report("re-added", &overlay);

    Ok(())
}

fn report(step: &str, overlay: &LabeledMarkerOverlay<HeadlessHost>) {
    let position = overlay.position();
    match overlay.label_element() {
        Some(label) => println!(
            "{}: marker ({:.4}, {:.4}) label left={} top={} style={:?}",
            step,
            position.lat,
            position.lng,
            label.style("left").unwrap_or_default(),
            label.style("top").unwrap_or_default(),
            label.style_map()
        ),
        None => log::warn!("{}: label not attached", step),
    }
}
