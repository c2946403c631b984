pub mod frame_grabber;
