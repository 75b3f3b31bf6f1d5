mod common;
mod deploy_tests;
mod get_tests;
mod synth_tests;
