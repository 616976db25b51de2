pub mod event_recorder;
