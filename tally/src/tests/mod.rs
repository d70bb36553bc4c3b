
mod tokenizer;




mod rules;

// Validation and engine tests
mod engine;
