mod facade_test;
