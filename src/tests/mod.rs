pub mod test_gradient;
