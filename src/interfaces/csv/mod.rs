pub mod purchase_script;
