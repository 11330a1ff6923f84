//! Drive the inspector with the headless backend.
//!
//! Registers a small robot scene, hides one branch through a scripted tree
//! click, and prints the resulting tree.
//!
//! Run with: cargo run -p horizon-inspector --example headless_demo

use std::thread;
use std::time::Duration;

use horizon_inspector::headless::HeadlessBackend;
use horizon_inspector::prelude::*;
use horizon_inspector::{TreeDebug, TreeFormatOptions};
use horizon_inspector_core::scene::Shape;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let backend = HeadlessBackend::new();
    let display = DisplayBuilder::new()
        .app_name("HeadlessDemo")
        .poll_interval(Duration::from_millis(5))
        .build(backend.clone())
        .expect("failed to start display");

    let base = Shape::new_ref("base");
    let gripper = Shape::new_ref("gripper");
    display.add("Robot::Base", base.clone());
    display.add("Robot::Arm::Gripper", gripper.clone());
    display.add_with(
        "Sensors::Lidar",
        Shape::new_ref("lidar"),
        AddOptions::new().on_click(|item| {
            tracing::info!(path = %item.path, state = ?item.check_state, "lidar row clicked");
        }),
    );
    display.add_key_handler('q', |_| true, "quit");
    display.track_default(gripper.clone());

    let tree = display.tree().expect("tree exists after add");
    let arm = tree.find("Robot::Arm").expect("arm row");
    backend.controller().interact(ViewInteraction::Toggled(arm));
    while gripper.node_mask() != 0 {
        thread::sleep(Duration::from_millis(5));
    }

    let text = TreeDebug::with_options(TreeFormatOptions::detailed()).format(&tree);
    println!("{text}");
    println!("base mask: {:#x}, gripper mask: {:#x}", base.node_mask(), gripper.node_mask());

    backend.controller().close_window();
    display.block_for_close();
}
