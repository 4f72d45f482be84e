//! Integration tests for initialization, pre-baking and shutdown
//!
//! These tests verify that:
//! - Pre-bake jobs fill the glyph cache off the render thread
//! - Drawing waits for an outstanding pre-bake
//! - Closing cancels a running pre-bake and releases every texture

mod common;

use common::{init_tracing, BlockFont};
use pagefont::{
    Color, FontRenderer, HeadlessBackend, PrebakeOutcome, TextError, ThreadExecutor, TokioExecutor,
};
use std::time::Duration;

#[test]
fn test_thread_prebake_then_draw() {
    init_tracing();
    let mut renderer = FontRenderer::builder(vec![BlockFont::new(10.0)], 10.0, HeadlessBackend::new())
        .executor(ThreadExecutor)
        .prebake("ABCЖ")
        .build()
        .unwrap();

    // the draw blocks until the pre-bake has finished
    renderer.draw_string("A", 0.0, 0.0, Color::WHITE).unwrap();
    assert!(!renderer.is_prebake_pending());
    assert_eq!(renderer.page_count(), 2);
    assert!(renderer.resolved_count() >= 4);
    // only the page drawn from is on the GPU
    assert_eq!(renderer.backend().upload_count(), 1);
}

#[test]
fn test_tokio_prebake() {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let mut renderer = FontRenderer::builder(vec![BlockFont::new(10.0)], 10.0, HeadlessBackend::new())
        .executor(TokioExecutor::new(runtime.handle().clone()))
        .prebake("0123456789")
        .build()
        .unwrap();

    renderer.draw_string("42", 0.0, 0.0, Color::WHITE).unwrap();
    assert_eq!(renderer.resolved_count(), 10);
    assert_eq!(renderer.page_count(), 1);
}

#[test]
fn test_close_cancels_running_prebake() {
    init_tracing();
    // every page bake takes about 256ms; four pages are requested
    let font = BlockFont::slow(10.0, Duration::from_millis(1));
    let mut renderer = FontRenderer::builder(vec![font], 10.0, HeadlessBackend::new())
        .executor(ThreadExecutor)
        .prebake("AЖ文한")
        .build()
        .unwrap();

    renderer.close();
    assert!(!renderer.is_initialized());
    assert!(matches!(
        renderer.last_prebake_outcome(),
        Some(PrebakeOutcome::Cancelled { resolved }) if *resolved < 4
    ));
    assert_eq!(renderer.page_count(), 0);
    assert_eq!(renderer.resolved_count(), 0);
    assert!(renderer.backend().live_textures().is_empty());

    // a job still running after close would have added pages by now
    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(renderer.page_count(), 0);
    assert_eq!(renderer.resolved_count(), 0);
}

#[test]
fn test_rebuild_after_close_prebakes_again() {
    init_tracing();
    let mut renderer = FontRenderer::builder(vec![BlockFont::new(10.0)], 10.0, HeadlessBackend::new())
        .executor(ThreadExecutor)
        .prebake("AB")
        .build()
        .unwrap();
    renderer.draw_string("A", 0.0, 0.0, Color::WHITE).unwrap();
    renderer.close();

    renderer.initialize().unwrap();
    renderer.draw_string("B", 0.0, 0.0, Color::WHITE).unwrap();
    assert_eq!(renderer.resolved_count(), 2);
    assert_eq!(renderer.backend().live_textures().len(), 1);
}

#[test]
fn test_initialize_twice_fails() {
    let mut renderer = FontRenderer::new(vec![BlockFont::new(10.0)], 10.0, HeadlessBackend::new()).unwrap();
    assert!(matches!(
        renderer.initialize(),
        Err(TextError::AlreadyInitialized)
    ));
}

#[test]
fn test_drop_releases_textures() {
    let mut backend = HeadlessBackend::new();
    {
        let mut renderer = FontRenderer::new(vec![BlockFont::new(10.0)], 10.0, &mut backend).unwrap();
        renderer.draw_string("AЖ", 0.0, 0.0, Color::WHITE).unwrap();
        assert_eq!(renderer.backend().live_textures().len(), 2);
    }
    assert!(backend.live_textures().is_empty());
    assert_eq!(backend.destroyed_count(), 2);
}
