pub mod image_writer;
