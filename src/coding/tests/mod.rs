mod multiplex_test;
