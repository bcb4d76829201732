mod frames_test;
mod noise_test;
