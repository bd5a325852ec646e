use super::*;
use crate::wm::binding::{Button, Modifiers, MouseInput, MouseInputTarget};
use crate::wm::client_flags::WindowType;
use crate::wm::command::{Command, CommandError};
use crate::wm::event::{Event, MouseEvent, MouseEventKind, PropertyKind};
use crate::wm::geometry::{Direction, Pos};
use crate::wm::hints::Hints;
use crate::wm::layout::LayoutKind;
use crate::wm::selector::StringMatch;
use crate::wm::testing::{MockConnection, MockWindow};

const SCREEN: Region = Region {
    pos: Pos { x: 0, y: 0 },
    dim: crate::wm::geometry::Dim { w: 1000, h: 1000 },
};

fn setup() -> Model<MockConnection> {
    let conn = MockConnection::new(vec![SCREEN]);
    Model::new(conn, &Config::default()).unwrap()
}

fn window(name: &str) -> MockWindow {
    MockWindow {
        geometry: Region::new(10, 10, 300, 200),
        name: name.to_string(),
        class: name.to_uppercase(),
        instance: name.to_string(),
        ..MockWindow::default()
    }
}

fn spawn(model: &mut Model<MockConnection>, mock: MockWindow) -> Window {
    let window = model.conn_mut().add_window(mock);
    model.handle_event(Event::MapRequest {
        window,
        ignore: false,
    });
    window
}

fn frame(model: &Model<MockConnection>, window: Window) -> Window {
    model.client(window).unwrap().frame()
}

fn active_clients(model: &Model<MockConnection>) -> Vec<Window> {
    model
        .workspace(model.active_context(), model.active_workspace())
        .unwrap()
        .clients()
}

fn assert_focus_agrees(model: &Model<MockConnection>) {
    let active = model
        .workspace(model.active_context(), model.active_workspace())
        .unwrap()
        .focused_client();

    assert_eq!(model.focused(), active);
    assert_eq!(model.conn().focused, active);

    for client in model.clients() {
        assert_eq!(client.is_focused(), Some(client.window()) == active);
    }
}

#[test]
fn test_manage_maps_and_focuses() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let frame = frame(&model, a);

    assert_eq!(model.focused(), Some(a));
    assert!(model.conn().is_mapped(a));
    assert!(model.conn().is_mapped(frame));
    assert_eq!(model.conn().parents.get(&a), Some(&frame));
    assert_eq!(model.conn().client_list, vec![a]);

    // a lone tiled client covers the whole screen without decoration
    assert_eq!(model.conn().placed.get(&frame), Some(&SCREEN));
    assert_focus_agrees(&model);
}

#[test]
fn test_focus_follows_client_order() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    assert_eq!(active_clients(&model), vec![a, b]);
    assert_eq!(model.focused(), Some(b));
    assert_focus_agrees(&model);

    model.execute(Command::CycleFocus(Direction::Forward)).unwrap();
    assert_eq!(model.focused(), Some(a));
    assert_focus_agrees(&model);

    model.execute(Command::DragFocus(Direction::Forward)).unwrap();
    assert_eq!(active_clients(&model), vec![b, a]);
    assert_eq!(model.focused(), Some(a));
    assert_focus_agrees(&model);
}

#[test]
fn test_monocle_covers_screen() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.execute(Command::SetLayout(LayoutKind::Monocle)).unwrap();

    for window in [a, b] {
        let frame = frame(&model, window);
        assert_eq!(model.conn().placed.get(&frame), Some(&SCREEN));
    }
}

#[test]
fn test_producer_consumer_round_trip() {
    let mut model = setup();
    model.conn_mut().parent_pids.insert(12, 11);
    model.conn_mut().parent_pids.insert(11, 10);

    let a = spawn(&mut model, window("a"));
    let p = spawn(
        &mut model,
        MockWindow {
            pid: Some(10),
            ..window("term")
        },
    );
    let c = spawn(
        &mut model,
        MockWindow {
            pid: Some(12),
            ..window("player")
        },
    );

    assert_eq!(active_clients(&model), vec![a, c]);
    assert!(!model.client(p).unwrap().is_managed());
    assert!(!model.conn().is_mapped(p));
    assert_eq!(model.client(c).unwrap().producer(), Some(p));
    assert_eq!(model.focused(), Some(c));

    model.handle_event(Event::Destroy { window: c });

    assert!(model.client(c).is_none());
    assert_eq!(active_clients(&model), vec![a, p]);
    assert!(model.client(p).unwrap().is_managed());
    assert!(model.conn().is_mapped(p));
    assert_eq!(model.focused(), Some(p));
    assert_focus_agrees(&model);
}

#[test]
fn test_ignored_producer_is_not_consumed() {
    let mut config = Config::default();
    config.consume.ignore_producers = vec!["class=TERM".to_string()];

    let mut model = Model::new(MockConnection::new(vec![SCREEN]), &config).unwrap();
    model.conn_mut().parent_pids.insert(12, 10);

    let p = spawn(
        &mut model,
        MockWindow {
            pid: Some(10),
            ..window("term")
        },
    );
    let c = spawn(
        &mut model,
        MockWindow {
            pid: Some(12),
            ..window("player")
        },
    );

    assert_eq!(active_clients(&model), vec![p, c]);
    assert_eq!(model.client(c).unwrap().producer(), None);
}

#[test]
fn test_expected_unmap_keeps_client() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ActivateWorkspace(1)).unwrap();
    assert!(!model.conn().is_mapped(a));
    assert_eq!(model.focused(), None);
    assert_eq!(model.conn().current_desktop, Some(1));

    // the unmap we caused ourselves
    model.handle_event(Event::Unmap {
        window: a,
        ignore: false,
    });
    assert!(model.client(a).is_some());

    model.execute(Command::ToggleWorkspace).unwrap();
    assert!(model.conn().is_mapped(a));
    assert_eq!(model.focused(), Some(a));

    // the client withdrawing itself
    model.handle_event(Event::Unmap {
        window: a,
        ignore: false,
    });
    assert!(model.client(a).is_none());
    assert_eq!(model.focused(), None);
    assert_eq!(
        model.conn().icccm_states.get(&a),
        Some(&IcccmWindowState::Withdrawn)
    );
}

#[test]
fn test_destroy_while_hidden_removes_client() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ActivateWorkspace(1)).unwrap();
    model.handle_event(Event::Destroy { window: a });

    assert!(model.client(a).is_none());
    assert!(model.workspace(0, 0).unwrap().clients().is_empty());
}

#[test]
fn test_sticky_client_follows_workspace() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ToggleSticky).unwrap();
    assert!(model.client(a).unwrap().is_sticky());
    assert!(model.conn().window_states.contains(&(a, WindowState::Sticky)));

    model.execute(Command::ActivateWorkspace(2)).unwrap();
    assert_eq!(model.client(a).unwrap().workspace(), 2);
    assert_eq!(active_clients(&model), vec![a]);
    assert!(model.workspace(0, 0).unwrap().clients().is_empty());
    assert!(model.conn().is_mapped(a));
    assert_eq!(model.focused(), Some(a));
    assert_eq!(model.conn().window_desktops.get(&a), Some(&2));
}

#[test]
fn test_fullscreen_restores_free_region() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ToggleFloat).unwrap();
    let free = model.client(a).unwrap().free_region();
    assert_eq!(model.client(a).unwrap().active_region(), free);

    model.execute(Command::ToggleFullscreen).unwrap();
    assert_eq!(model.client(a).unwrap().active_region(), SCREEN);
    assert_eq!(model.conn().placed.get(&frame(&model, a)), Some(&SCREEN));
    assert!(model.conn().window_states.contains(&(a, WindowState::Fullscreen)));

    model.execute(Command::ToggleFullscreen).unwrap();
    assert_eq!(model.client(a).unwrap().free_region(), free);
    assert_eq!(model.client(a).unwrap().active_region(), free);
    assert!(!model.conn().window_states.contains(&(a, WindowState::Fullscreen)));
}

#[test]
fn test_iconify_and_deiconify() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.execute(Command::IconifyFocus).unwrap();
    assert!(!model.conn().is_mapped(b));
    assert!(model.client(b).unwrap().is_iconified());
    assert_eq!(active_clients(&model), vec![a]);
    assert_eq!(model.focused(), Some(a));
    assert!(model.conn().window_states.contains(&(b, WindowState::Hidden)));

    model.execute(Command::DeiconifyPop).unwrap();
    assert!(model.conn().is_mapped(b));
    assert_eq!(active_clients(&model), vec![a, b]);
    assert_eq!(model.focused(), Some(b));
    assert_focus_agrees(&model);
}

#[test]
fn test_disown_and_reclaim() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.execute(Command::ToggleDisown).unwrap();
    assert!(model.client(b).unwrap().is_disowned());
    assert_eq!(active_clients(&model), vec![a]);
    assert_eq!(model.focused(), Some(a));
    assert!(model.conn().is_mapped(b));

    // a disowned client cannot take focus
    model.focus(b);
    assert_eq!(model.focused(), Some(a));
}

#[test]
fn test_move_focus_to_workspace() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.execute(Command::MoveFocusToWorkspace(3)).unwrap();

    assert_eq!(active_clients(&model), vec![a]);
    assert_eq!(model.workspace(0, 3).unwrap().clients(), vec![b]);
    assert_eq!(model.client(b).unwrap().workspace(), 3);
    assert!(!model.conn().is_mapped(b));
    assert_eq!(model.focused(), Some(a));
    assert_focus_agrees(&model);
}

#[test]
fn test_index_out_of_range() {
    let mut model = setup();

    assert_eq!(
        model.execute(Command::ActivateWorkspace(12)),
        Err(CommandError::IndexOutOfRange(13))
    );
    assert_eq!(
        model.execute(Command::ActivateContext(9)),
        Err(CommandError::IndexOutOfRange(10))
    );
    assert_eq!(model.active_workspace(), 0);
}

#[test]
fn test_dock_strut_and_toggle() {
    let mut model = setup();
    let dock = spawn(
        &mut model,
        MockWindow {
            geometry: Region::new(0, 0, 1000, 30),
            window_type: WindowType::Dock,
            ..MockWindow::default()
        },
    );

    assert!(model.client(dock).is_none());
    assert!(model.conn().is_mapped(dock));

    let a = spawn(&mut model, window("a"));
    let frame = frame(&model, a);
    assert_eq!(
        model.conn().placed.get(&frame),
        Some(&Region::new(0, 30, 1000, 970))
    );

    model.execute(Command::ToggleStruts).unwrap();
    assert!(!model.conn().is_mapped(dock));
    assert_eq!(model.conn().placed.get(&frame), Some(&SCREEN));

    model.execute(Command::ToggleStruts).unwrap();
    assert!(model.conn().is_mapped(dock));

    model.handle_event(Event::Destroy { window: dock });
    assert_eq!(model.conn().placed.get(&frame), Some(&SCREEN));
}

#[test]
fn test_mouse_move() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    model.execute(Command::ToggleFloat).unwrap();

    let before = model.client(a).unwrap().free_region();
    let inner = model.conn().placed.get(&a).copied();
    model.conn_mut().pointer = Pos::new(50, 50);

    let input = MouseInput::new(MouseInputTarget::Client, Button::Left, Modifiers::SUPER);
    let mouse = |kind, pos| Event::Mouse {
        event: MouseEvent {
            kind,
            input,
            window: Some(a),
            root_rpos: pos,
        },
        on_root: false,
    };

    model.handle_event(mouse(MouseEventKind::Press, Pos::new(50, 50)));
    assert_eq!(model.conn().confined, Some(model.move_buffer.handle()));

    model.handle_event(mouse(MouseEventKind::Motion, Pos::new(80, 100)));
    let after = model.client(a).unwrap().free_region();
    assert_eq!(after.pos, Pos::new(before.pos.x + 30, before.pos.y + 50));
    assert_eq!(after.dim, before.dim);

    // a pure move only translates the frame
    let frame = frame(&model, a);
    assert_eq!(model.conn().placed.get(&frame).map(|region| region.pos), Some(after.pos));
    assert_eq!(model.conn().placed.get(&a).copied(), inner);

    model.handle_event(mouse(MouseEventKind::Release, Pos::new(80, 100)));
    assert_eq!(model.conn().confined, None);
    assert!(!model.move_buffer.is_occupied());
}

#[test]
fn test_tiled_client_cannot_be_moved() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.start_moving(a);
    assert!(!model.move_buffer.is_occupied());
}

#[test]
fn test_rules_place_without_focus() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let r = spawn(
        &mut model,
        MockWindow {
            instance: "krane:W2!@".to_string(),
            ..window("r")
        },
    );

    assert_eq!(model.focused(), Some(a));
    assert_eq!(model.client(r).unwrap().workspace(), 2);
    assert_eq!(model.workspace(0, 2).unwrap().clients(), vec![r]);
    assert!(!model.conn().is_mapped(r));
    assert_eq!(model.conn().window_desktops.get(&r), Some(&2));
}

#[test]
fn test_transient_floats_over_parent() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let d = spawn(
        &mut model,
        MockWindow {
            transient_for: Some(a),
            ..window("dialog")
        },
    );

    let dialog = model.client(d).unwrap();
    assert!(dialog.is_floating());
    assert_eq!(dialog.parent(), Some(a));
    assert_eq!(model.client(a).unwrap().children(), &[d]);
}

#[test]
fn test_jump_and_back() {
    let mut model = setup();
    let a = spawn(&mut model, window("alpha"));
    let b = spawn(&mut model, window("beta"));

    model.jump_client(&ClientSelector::Name(StringMatch::Equals("alpha".to_string())));
    assert_eq!(model.focused(), Some(a));

    model.execute(Command::JumpBack).unwrap();
    assert_eq!(model.focused(), Some(b));

    // jumping to the focused client returns to where we came from
    model.execute(Command::JumpIndex(1)).unwrap();
    assert_eq!(model.focused(), Some(a));

    model.jump_client(&ClientSelector::Class(StringMatch::Contains("ALP".to_string())));
    assert_eq!(model.focused(), Some(b));
    assert_focus_agrees(&model);
}

#[test]
fn test_context_switch() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ActivateContext(1)).unwrap();
    assert_eq!(model.active_context(), 1);
    assert!(!model.conn().is_mapped(a));
    assert_eq!(model.focused(), None);

    let b = spawn(&mut model, window("b"));
    assert_eq!(model.client(b).unwrap().context(), 1);

    model.execute(Command::ToggleContext).unwrap();
    assert_eq!(model.active_context(), 0);
    assert!(model.conn().is_mapped(a));
    assert!(!model.conn().is_mapped(b));
    assert_eq!(model.focused(), Some(a));
}

#[test]
fn test_kill_respects_invincible() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ToggleInvincible).unwrap();
    model.execute(Command::KillFocus).unwrap();
    assert!(model.conn().closed.is_empty());

    model.execute(Command::ToggleInvincible).unwrap();
    model.execute(Command::KillFocus).unwrap();
    assert_eq!(model.conn().closed, vec![a]);
}

#[test]
fn test_quit_and_exit() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.execute(Command::IconifyFocus).unwrap();
    model.execute(Command::Quit).unwrap();
    assert!(!model.is_running());

    model.exit();
    assert!(model.conn().parents.is_empty());
    assert!(model.conn().is_mapped(a));
    assert!(model.conn().is_mapped(b));
    assert!(model.conn().cleaned_up);
}

#[test]
fn test_screen_change_resizes_partition() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    let wide = Region::new(0, 0, 1600, 900);
    model.conn_mut().outputs = vec![wide];

    model.handle_event(Event::ScreenChange);
    assert_eq!(model.conn().placed.get(&frame(&model, a)), Some(&wide));
}

#[test]
fn test_stack_layers_for_mixed_window_types() {
    let mut model = setup();

    let desktop = spawn(
        &mut model,
        MockWindow {
            window_type: WindowType::Desktop,
            ..MockWindow::default()
        },
    );
    let note = spawn(
        &mut model,
        MockWindow {
            window_type: WindowType::Notification,
            ..MockWindow::default()
        },
    );
    let dock = spawn(
        &mut model,
        MockWindow {
            geometry: Region::new(0, 0, 1000, 30),
            window_type: WindowType::Dock,
            ..MockWindow::default()
        },
    );

    let a = spawn(&mut model, window("a"));
    let full = spawn(
        &mut model,
        MockWindow {
            fullscreen: true,
            ..window("full")
        },
    );
    let d = spawn(
        &mut model,
        MockWindow {
            window_type: WindowType::Dialog,
            ..window("dialog")
        },
    );

    assert!(model.client(d).unwrap().is_free());

    let expected = vec![
        desktop,
        dock,
        frame(&model, a),
        frame(&model, full),
        frame(&model, d),
        note,
    ];

    assert_eq!(model.stacking_order, expected);
    assert_eq!(model.conn().stack, expected);
}

#[test]
fn test_restack_only_changed_suffix() {
    let mut model = setup();
    let desktop = spawn(
        &mut model,
        MockWindow {
            window_type: WindowType::Desktop,
            ..MockWindow::default()
        },
    );
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));
    let (fa, fb) = (frame(&model, a), frame(&model, b));

    assert_eq!(model.conn().stack, vec![desktop, fa, fb]);

    // nothing moved, nothing restacked
    let before = model.conn().restacks.len();
    model.apply_stack(0, 0);
    assert_eq!(model.conn().restacks.len(), before);

    model.focus(a);
    assert_eq!(
        model.conn().restacks[before..],
        [(fb, Some(desktop)), (fa, Some(fb))]
    );
    assert_eq!(model.conn().stack, vec![desktop, fb, fa]);
}

#[test]
fn test_client_lists_track_hidden_workspaces() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));

    model.execute(Command::ActivateWorkspace(1)).unwrap();
    model.handle_event(Event::Destroy { window: a });

    assert!(model.conn().client_list.is_empty());
    assert!(model.conn().client_list_stacking.is_empty());

    let r = spawn(
        &mut model,
        MockWindow {
            instance: "krane:W2!@".to_string(),
            ..window("r")
        },
    );
    assert!(!model.conn().is_mapped(r));
    assert_eq!(model.conn().client_list, vec![r]);

    let b = spawn(&mut model, window("b"));
    assert_eq!(model.conn().client_list, vec![r, b]);
    assert_eq!(model.conn().client_list_stacking, vec![r, b]);
}

#[test]
fn test_sticky_client_unsticks_when_moved() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.execute(Command::ToggleSticky).unwrap();
    model.execute(Command::MoveFocusToWorkspace(3)).unwrap();

    let client = model.client(b).unwrap();
    assert!(!client.is_sticky());
    assert_eq!(client.workspace(), 3);
    assert!(!model.conn().window_states.contains(&(b, WindowState::Sticky)));
    assert!(!model.conn().is_mapped(b));
    assert_eq!(model.focused(), Some(a));

    // no longer carried along
    model.execute(Command::ActivateWorkspace(1)).unwrap();
    assert_eq!(model.client(b).unwrap().workspace(), 3);
    assert!(!model.conn().is_mapped(b));
}

#[test]
fn test_sticky_window_managed_on_active_workspace() {
    let mut model = setup();
    let s = spawn(
        &mut model,
        MockWindow {
            instance: "krane:W2".to_string(),
            state: Some(WindowState::Sticky),
            ..window("s")
        },
    );

    let client = model.client(s).unwrap();
    assert!(client.is_sticky());
    assert_eq!(client.workspace(), 0);
    assert!(model.conn().is_mapped(s));
    assert_eq!(model.focused(), Some(s));
}

#[test]
fn test_jump_urgent_clears_urgency_hint() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    model.conn_mut().windows.get_mut(&a).unwrap().hints = Some(Hints {
        urgent: true,
        ..Hints::default()
    });
    model.handle_event(Event::Property {
        window: a,
        kind: PropertyKind::Hints,
        on_root: false,
    });
    assert!(model.client(a).unwrap().is_urgent());
    assert_eq!(model.focused(), Some(b));

    model.execute(Command::JumpUrgent).unwrap();
    assert_eq!(model.focused(), Some(a));
    assert!(!model.client(a).unwrap().is_urgent());
    assert_eq!(model.conn().windows[&a].hints.map(|hints| hints.urgent), Some(false));

    // nothing urgent left
    model.execute(Command::JumpUrgent).unwrap();
    assert_eq!(model.focused(), Some(a));
}

#[test]
fn test_float_retain_region_keeps_tiled_geometry() {
    let mut model = setup();
    let a = spawn(&mut model, window("a"));
    let b = spawn(&mut model, window("b"));

    let tiled: Vec<Region> = [a, b]
        .iter()
        .map(|&window| model.client(window).unwrap().active_region())
        .collect();

    model.execute(Command::FloatRetainRegion).unwrap();

    for (window, region) in [a, b].into_iter().zip(tiled) {
        assert_eq!(model.client(window).unwrap().free_region(), region);
        assert_eq!(model.client(window).unwrap().active_region(), region);
    }
}
