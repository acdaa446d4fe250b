pub mod school_form;
