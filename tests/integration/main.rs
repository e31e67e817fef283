mod synth_test;
