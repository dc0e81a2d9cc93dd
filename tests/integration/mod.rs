mod gfd_ninja;
mod properties;
