pub mod unsigned_ints_ext;
