use std::sync::Arc;

use super::*;
use crate::assets::store::PreparedImage;
use crate::foundation::core::Rect;
use crate::scene::item::{DEFAULT_TOKEN_BORDER, Token};
use crate::viewport::mapper::Viewport;

fn doc() -> MapDocument {
    let mut d = MapDocument::new(
        "t",
        "maps/t.png",
        Arc::new(PreparedImage::placeholder(1000, 800)),
    );
    d.viewport = Viewport::new(800, 600);
    d
}

fn token_at(doc: &mut MapDocument, x: f64, y: f64) -> ItemId {
    doc.store.insert(
        SceneItem::new(
            Point::new(x, y),
            ItemKind::Token(Token {
                entity_type: "NPCs".into(),
                entity_id: "Orc".into(),
                image_path: String::new(),
                size: 40.0,
                border_color: DEFAULT_TOKEN_BORDER,
                hp: 5,
                max_hp: 5,
            }),
        )
        .unwrap(),
    )
}

fn click(m: &mut Interaction, d: &mut MapDocument, p: Point, mods: Modifiers) -> InputOutcome {
    m.pointer_down(d, p, PointerButton::Primary, mods).unwrap();
    m.pointer_up(d, p).unwrap()
}

fn drag(m: &mut Interaction, d: &mut MapDocument, from: Point, to: Point, mods: Modifiers) -> InputOutcome {
    m.pointer_down(d, from, PointerButton::Primary, mods).unwrap();
    m.pointer_move(d, to).unwrap();
    m.pointer_up(d, to).unwrap()
}

#[test]
fn rectangle_tool_creates_centered_default_shape() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Rectangle);
    let out = click(&mut m, &mut d, Point::new(200.0, 100.0), Modifiers::NONE);
    assert!(out.persist);
    assert_eq!(d.store.len(), 1);
    let id = m.selection().sole().unwrap();
    let item = d.store.get(id).unwrap();
    assert_eq!(item.bounding_box(), Rect::new(175.0, 75.0, 225.0, 125.0));
    assert_eq!(
        item.shape().unwrap().fill(),
        Some(ToolSettings::default().shape_fill)
    );
}

#[test]
fn marker_tool_places_marker() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Marker);
    click(&mut m, &mut d, Point::new(50.0, 60.0), Modifiers::NONE);
    let (_, item) = d.store.iter().next().unwrap();
    assert!(item.is_marker());
    assert_eq!(item.position(), Point::new(50.0, 60.0));
}

#[test]
fn drag_moves_after_threshold_and_scales_by_zoom() {
    let mut d = doc();
    d.viewport.set_zoom(2.0);
    let id = token_at(&mut d, 10.0, 10.0);
    let mut m = Interaction::new(ToolSettings::default());

    m.pointer_down(&mut d, Point::new(40.0, 40.0), PointerButton::Primary, Modifiers::NONE)
        .unwrap();
    let small = m.pointer_move(&mut d, Point::new(41.0, 41.0)).unwrap();
    assert_eq!(small.redraw, Redraw::None);
    assert_eq!(d.store.get(id).unwrap().position(), Point::new(10.0, 10.0));

    m.pointer_move(&mut d, Point::new(60.0, 40.0)).unwrap();
    let out = m.pointer_up(&mut d, Point::new(60.0, 40.0)).unwrap();
    assert!(out.persist);
    assert_eq!(d.store.get(id).unwrap().position(), Point::new(20.0, 10.0));
    assert!(!d.store.runtime(id).unwrap().hover_visible);
}

#[test]
fn click_without_motion_toggles_hover_card() {
    let mut d = doc();
    let a = token_at(&mut d, 10.0, 10.0);
    let b = token_at(&mut d, 100.0, 10.0);
    let mut m = Interaction::new(ToolSettings::default());

    click(&mut m, &mut d, Point::new(20.0, 20.0), Modifiers::NONE);
    assert!(d.store.runtime(a).unwrap().hover_visible);
    click(&mut m, &mut d, Point::new(110.0, 20.0), Modifiers::NONE);
    assert!(!d.store.runtime(a).unwrap().hover_visible);
    assert!(d.store.runtime(b).unwrap().hover_visible);

    // empty space hides popups
    click(&mut m, &mut d, Point::new(500.0, 500.0), Modifiers::NONE);
    assert!(!d.store.runtime(b).unwrap().hover_visible);
    assert!(m.selection().is_empty());
}

#[test]
fn clicking_sole_selected_item_clears_selection() {
    let mut d = doc();
    let a = token_at(&mut d, 10.0, 10.0);
    let mut m = Interaction::new(ToolSettings::default());
    click(&mut m, &mut d, Point::new(20.0, 20.0), Modifiers::NONE);
    assert_eq!(m.selection().ids(), &[a]);
    click(&mut m, &mut d, Point::new(20.0, 20.0), Modifiers::NONE);
    assert!(m.selection().is_empty());
}

#[test]
fn group_drag_moves_every_selected_item() {
    let mut d = doc();
    let a = token_at(&mut d, 10.0, 10.0);
    let b = token_at(&mut d, 100.0, 10.0);
    let mut m = Interaction::new(ToolSettings::default());
    click(&mut m, &mut d, Point::new(20.0, 20.0), Modifiers::NONE);
    click(&mut m, &mut d, Point::new(110.0, 20.0), Modifiers::SHIFT);
    drag(
        &mut m,
        &mut d,
        Point::new(20.0, 20.0),
        Point::new(20.0, 50.0),
        Modifiers::NONE,
    );
    assert_eq!(d.store.get(a).unwrap().position(), Point::new(10.0, 40.0));
    assert_eq!(d.store.get(b).unwrap().position(), Point::new(100.0, 40.0));
    assert_eq!(m.selection().len(), 2);
}

#[test]
fn marquee_merges_by_modifier() {
    let mut d = doc();
    let a = token_at(&mut d, 10.0, 10.0);
    let b = token_at(&mut d, 200.0, 10.0);
    let mut m = Interaction::new(ToolSettings::default());

    drag(&mut m, &mut d, Point::new(0.0, 300.0), Point::new(60.0, 0.0), Modifiers::NONE);
    assert_eq!(m.selection().ids(), &[a]);

    drag(&mut m, &mut d, Point::new(150.0, 300.0), Point::new(400.0, 0.0), Modifiers::SHIFT);
    assert_eq!(m.selection().ids(), &[a, b]);

    drag(&mut m, &mut d, Point::new(0.0, 300.0), Point::new(60.0, 0.0), Modifiers::CTRL);
    assert_eq!(m.selection().ids(), &[b]);

    // a tiny drag is a click on empty space
    drag(&mut m, &mut d, Point::new(500.0, 500.0), Point::new(502.0, 501.0), Modifiers::NONE);
    assert!(m.selection().is_empty());
}

#[test]
fn marquee_preview_appears_after_five_pixels() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.pointer_down(&mut d, Point::new(300.0, 300.0), PointerButton::Primary, Modifiers::NONE)
        .unwrap();
    m.pointer_move(&mut d, Point::new(303.0, 303.0)).unwrap();
    assert_eq!(m.decorations(&d).marquee, None);
    m.pointer_move(&mut d, Point::new(310.0, 300.0)).unwrap();
    assert!(m.decorations(&d).marquee.is_some());
}

#[test]
fn handle_drag_resizes_with_zoom_dependent_minimum() {
    let mut d = doc();
    d.viewport.set_zoom(0.5);
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Rectangle);
    // world (100,100) at zoom 0.5 -> screen (50,50)
    click(&mut m, &mut d, Point::new(50.0, 50.0), Modifiers::NONE);
    let id = m.selection().sole().unwrap();
    m.set_tool(Tool::Select);
    assert!(m.begin_graphical_edit(&mut d, id));
    assert!(m.decorations(&d).handles.is_some());

    // se handle at world (125,125) -> screen (62.5,62.5); drag far up-left
    drag(
        &mut m,
        &mut d,
        Point::new(62.5, 62.5),
        Point::new(0.0, 0.0),
        Modifiers::NONE,
    );
    let b = d.store.get(id).unwrap().bounding_box();
    assert_eq!((b.width(), b.height()), (16.0, 16.0));
    assert_eq!((b.x0, b.y0), (75.0, 75.0));
    assert_eq!(m.selection().graphical_edit(), Some(id));
}

#[test]
fn graphical_edit_ends_on_empty_click() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Oval);
    click(&mut m, &mut d, Point::new(100.0, 100.0), Modifiers::NONE);
    let id = m.selection().sole().unwrap();
    m.set_tool(Tool::Select);
    m.begin_graphical_edit(&mut d, id);
    click(&mut m, &mut d, Point::new(600.0, 500.0), Modifiers::NONE);
    assert_eq!(m.selection().graphical_edit(), None);
    assert!(!m.begin_graphical_edit(&mut d, ItemId(999)));
}

#[test]
fn freehand_commits_strokes_with_two_points() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Freehand);
    let out = click(&mut m, &mut d, Point::new(10.0, 10.0), Modifiers::NONE);
    assert!(!out.persist);
    assert!(d.store.is_empty());

    m.pointer_down(&mut d, Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::NONE)
        .unwrap();
    m.pointer_move(&mut d, Point::new(10.5, 10.0)).unwrap();
    m.pointer_move(&mut d, Point::new(20.0, 10.0)).unwrap();
    assert_eq!(m.decorations(&d).stroke_preview.len(), 2);
    let out = m.pointer_up(&mut d, Point::new(30.0, 15.0)).unwrap();
    assert!(out.persist);
    let (_, item) = d.store.iter().next().unwrap();
    let ItemKind::FreehandStroke(s) = &item.kind else {
        panic!("stroke expected");
    };
    assert_eq!(s.points.len(), 3);
    assert_eq!(item.position(), Point::new(10.0, 10.0));
}

#[test]
fn fog_brush_gesture_pushes_history_once() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Fog {
        mode: FogMode::Remove,
        kind: FogTool::Brush,
    });
    m.pointer_down(&mut d, Point::new(100.0, 100.0), PointerButton::Primary, Modifiers::NONE)
        .unwrap();
    for x in 0..10 {
        m.pointer_move(&mut d, Point::new(100.0 + f64::from(x) * 5.0, 100.0))
            .unwrap();
    }
    let out = m.pointer_up(&mut d, Point::new(150.0, 100.0)).unwrap();
    assert!(out.persist);
    assert_eq!(d.fog.history().len(), 1);
    assert_eq!(d.fog.raster().alpha_at(100, 100), Some(0));

    m.undo_fog(&mut d).unwrap();
    assert_eq!(d.fog.raster().alpha_at(100, 100), Some(128));
}

#[test]
fn fog_rect_fills_on_release() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Fog {
        mode: FogMode::Remove,
        kind: FogTool::Rect,
    });
    m.pointer_down(&mut d, Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::NONE)
        .unwrap();
    m.pointer_move(&mut d, Point::new(50.0, 30.0)).unwrap();
    assert!(m.decorations(&d).fog_rect_preview.is_some());
    assert_eq!(d.fog.raster().alpha_at(20, 20), Some(128));
    m.pointer_up(&mut d, Point::new(50.0, 30.0)).unwrap();
    assert_eq!(d.fog.raster().alpha_at(20, 20), Some(0));
    assert_eq!(d.fog.raster().alpha_at(60, 20), Some(128));
    assert_eq!(d.fog.history().len(), 1);
}

#[test]
fn empty_fog_rect_leaves_no_undo_step() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.set_tool(Tool::Fog {
        mode: FogMode::Remove,
        kind: FogTool::Rect,
    });
    m.pointer_down(&mut d, Point::new(40.0, 40.0), PointerButton::Primary, Modifiers::NONE)
        .unwrap();
    let out = m.pointer_up(&mut d, Point::new(40.0, 40.0)).unwrap();
    assert!(!out.persist);
    assert_eq!(out.redraw, Redraw::Overlay);
    assert!(d.fog.history().is_empty());
    assert_eq!(d.fog.raster().alpha_at(40, 40), Some(128));
}

#[test]
fn pan_button_translates_the_view() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    m.pointer_down(&mut d, Point::new(10.0, 10.0), PointerButton::Pan, Modifiers::NONE)
        .unwrap();
    assert!(m.panning());
    let out = m.pointer_move(&mut d, Point::new(30.0, 5.0)).unwrap();
    assert_eq!(out.redraw, Redraw::Translate(Vec2::new(20.0, -5.0)));
    let out = m.pointer_up(&mut d, Point::new(30.0, 5.0)).unwrap();
    assert_eq!(out.redraw, Redraw::Full);
    assert_eq!(d.viewport.pan(), Vec2::new(20.0, -5.0));
}

#[test]
fn paste_preserves_offsets_at_pointer_or_center() {
    let mut d = doc();
    let a = token_at(&mut d, 10.0, 10.0);
    let b = token_at(&mut d, 110.0, 60.0);
    let mut m = Interaction::new(ToolSettings::default());
    drag(&mut m, &mut d, Point::new(0.0, 0.0), Point::new(300.0, 300.0), Modifiers::NONE);
    assert_eq!(m.selection().ids(), &[a, b]);
    assert_eq!(m.copy_selection(&d), 2);

    m.pointer_move(&mut d, Point::new(400.0, 300.0)).unwrap();
    m.paste(&mut d);
    let pasted = m.selection().ids().to_vec();
    assert_eq!(pasted.len(), 2);
    let p0 = d.store.get(pasted[0]).unwrap().position();
    let p1 = d.store.get(pasted[1]).unwrap().position();
    assert_eq!(p0, Point::new(400.0, 300.0));
    assert_eq!(p1 - p0, Vec2::new(100.0, 50.0));

    m.pointer_left();
    m.paste(&mut d);
    let p0 = d.store.get(m.selection().ids()[0]).unwrap().position();
    assert_eq!(p0, d.viewport.viewport_center_world());
}

#[test]
fn delete_removes_selection_and_runtime() {
    let mut d = doc();
    let a = token_at(&mut d, 10.0, 10.0);
    let mut m = Interaction::new(ToolSettings::default());
    click(&mut m, &mut d, Point::new(20.0, 20.0), Modifiers::NONE);
    let out = m.delete_selected(&mut d);
    assert!(out.persist);
    assert!(d.store.is_empty());
    assert!(d.store.runtime(a).is_none());
    assert!(m.selection().is_empty());
    assert_eq!(m.delete_selected(&mut d), InputOutcome::default());
}

#[test]
fn double_click_follows_linked_marker() {
    let mut d = doc();
    let mut mk = Marker::new("stairs");
    mk.linked_map = Some("Cellar".into());
    d.store
        .insert(SceneItem::new(Point::new(10.0, 10.0), ItemKind::Marker(mk)).unwrap());
    let mut m = Interaction::new(ToolSettings::default());
    let out = m.double_click(&d, Point::new(20.0, 20.0));
    assert_eq!(out.navigate_to.as_deref(), Some("Cellar"));
    assert_eq!(m.double_click(&d, Point::new(700.0, 500.0)).navigate_to, None);
}

#[test]
fn z_order_keeps_relative_order_of_selection() {
    let mut d = doc();
    let a = token_at(&mut d, 0.0, 0.0);
    let b = token_at(&mut d, 100.0, 0.0);
    let c = token_at(&mut d, 200.0, 0.0);
    let mut m = Interaction::new(ToolSettings::default());
    click(&mut m, &mut d, Point::new(210.0, 10.0), Modifiers::NONE);
    click(&mut m, &mut d, Point::new(10.0, 10.0), Modifiers::SHIFT);

    m.send_to_back(&mut d);
    assert_eq!(d.store.ids(), vec![a, c, b]);
    m.bring_to_front(&mut d);
    assert_eq!(d.store.ids(), vec![b, a, c]);
}

#[test]
fn wheel_zooms_around_cursor() {
    let mut d = doc();
    let mut m = Interaction::new(ToolSettings::default());
    let cursor = Point::new(300.0, 200.0);
    let before = screen_to_world(cursor, &d.viewport);
    let out = m.wheel(&mut d, cursor, 3);
    assert!(out.persist);
    assert!((d.viewport.zoom() - 1.3).abs() < 1e-9);
    let after = screen_to_world(cursor, &d.viewport);
    assert!((before - after).hypot() < 1e-9);

    d.viewport.set_zoom(3.0);
    assert_eq!(m.wheel(&mut d, cursor, 1), InputOutcome::default());
}

#[test]
fn redraw_merge_covers_both() {
    let t = Redraw::Translate(Vec2::new(1.0, 0.0));
    assert_eq!(t.merge(t), Redraw::Translate(Vec2::new(2.0, 0.0)));
    assert_eq!(t.merge(Redraw::Overlay), Redraw::Full);
    assert_eq!(Redraw::None.merge(Redraw::Overlay), Redraw::Overlay);
    assert_eq!(Redraw::Full.merge(t), Redraw::Full);
}
