//! End-to-end tests driving the controller against a real framebuffer.
