use super::*;

#[test]
fn record_uses_table_keys() {
    let mut r = MapRecord::new("Cave", "maps/cave.png");
    r.fog_mask_path = "masks/cave_mask.png".to_string();
    let v = serde_json::to_value(&r).unwrap();
    for key in [
        "Name",
        "Image",
        "FogMaskPath",
        "Tokens",
        "pan_x",
        "pan_y",
        "zoom",
        "token_size",
        "hover_font_size",
    ] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
    assert_eq!(v["Tokens"], "[]");
}

#[test]
fn missing_fields_take_defaults() {
    let r: MapRecord = serde_json::from_str(r#"{"Name":"A"}"#).unwrap();
    assert_eq!(r.zoom, 1.0);
    assert_eq!(r.token_size, 48.0);
    assert_eq!(r.hover_font_size, 14);
    assert_eq!(r.tokens, "[]");
    assert_eq!(r.fog_mask(), None);
}

#[test]
fn inline_token_lists_become_strings() {
    let r: MapRecord =
        serde_json::from_str(r#"{"Name":"A","Tokens":[{"type":"marker","x":1,"y":2}]}"#).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&r.tokens).unwrap();
    assert_eq!(parsed[0]["type"], "marker");

    let r: MapRecord = serde_json::from_str(r#"{"Name":"A","Tokens":null}"#).unwrap();
    assert_eq!(r.tokens, "[]");
}

#[test]
fn mask_path_uses_image_stem() {
    assert_eq!(mask_rel_path("maps/cave.png"), "masks/cave_mask.png");
    assert_eq!(mask_rel_path("maps\\Old Keep.jpg"), "masks/Old Keep_mask.png");
}
